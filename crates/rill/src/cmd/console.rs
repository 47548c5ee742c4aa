//! Interactive console
//!
//! Line-edited REPL with history and TAB completion. Input is tokenized
//! with shlex (quotes respected) and dispatched over a closed command enum,
//! so every operation the console knows is handled exhaustively.
//!
//! Errors from the bus render as messages and drop back to the prompt;
//! nothing short of `exit` (or Ctrl-D) ends the console.

use std::collections::HashSet;

use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use super::list::ListMode;
use super::Ctx;

/// Top-level commands, for dispatch and TAB completion
const COMMANDS: &[&str] = &["help", "list", "logs", "command", "read", "exit"];

/// Arguments `list` accepts
const LIST_MODES: &[&str] = &["elements", "streams", "commands"];

/// One parsed console command
#[derive(Debug, PartialEq)]
pub(crate) enum ConsoleCommand {
    Help,
    Exit,
    List(ListMode),
    Logs {
        window_secs: Option<u64>,
        elements: Vec<String>,
    },
    Command {
        element: String,
        command: String,
        payload: Option<String>,
    },
    Read {
        target: String,
        rate: Option<f64>,
    },
}

impl ConsoleCommand {
    /// Parse tokenized input; `Err` carries the usage message to show
    pub(crate) fn parse(tokens: &[String]) -> Result<Self, String> {
        let Some((command, args)) = tokens.split_first() else {
            return Err("Invalid command. Type 'help' for valid commands.".into());
        };

        match command.as_str() {
            "help" => Ok(Self::Help),
            "exit" => Ok(Self::Exit),
            "list" => parse_list(args),
            "logs" => Ok(parse_logs(args)),
            "command" => parse_command(args),
            "read" => parse_read(args),
            _ => Err("Invalid command. Type 'help' for valid commands.".into()),
        }
    }
}

fn parse_list(args: &[String]) -> Result<ConsoleCommand, String> {
    let Some(mode) = args.first() else {
        return Err("'list' must have an argument.".into());
    };
    match mode.as_str() {
        "elements" => {
            if args.len() > 1 {
                return Err("Invalid number of arguments for command 'list elements'.".into());
            }
            Ok(ConsoleCommand::List(ListMode::Elements))
        }
        "streams" => {
            if args.len() > 2 {
                return Err("'list' takes at most 2 arguments.".into());
            }
            Ok(ConsoleCommand::List(ListMode::Streams {
                element: args.get(1).cloned(),
            }))
        }
        "commands" => {
            if args.len() != 2 {
                return Err("'list commands' takes exactly one element.".into());
            }
            Ok(ConsoleCommand::List(ListMode::Commands {
                element: args[1].clone(),
            }))
        }
        _ => Err("Invalid argument to 'list'.".into()),
    }
}

/// A leading integer is the lookback window in seconds; everything else
/// filters by element name
fn parse_logs(args: &[String]) -> ConsoleCommand {
    if let Some((first, rest)) = args.split_first() {
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(window) = first.parse::<u64>() {
                return ConsoleCommand::Logs {
                    window_secs: Some(window),
                    elements: rest.to_vec(),
                };
            }
        }
    }
    ConsoleCommand::Logs {
        window_secs: None,
        elements: args.to_vec(),
    }
}

fn parse_command(args: &[String]) -> Result<ConsoleCommand, String> {
    if args.len() < 2 {
        return Err("Too few arguments.".into());
    }
    if args.len() > 3 {
        return Err("Too many arguments.".into());
    }
    Ok(ConsoleCommand::Command {
        element: args[0].clone(),
        command: args[1].clone(),
        payload: args.get(2).cloned(),
    })
}

fn parse_read(args: &[String]) -> Result<ConsoleCommand, String> {
    if args.is_empty() {
        return Err("Too few arguments.".into());
    }
    if args.len() > 2 {
        return Err("Too many arguments.".into());
    }
    let target = args[0].clone();
    if !target.contains(':') {
        return Err("target must be element:stream.".into());
    }
    let rate = match args.get(1) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(rate) if rate > 0.0 => Some(rate),
            _ => return Err("rate must be a positive number.".into()),
        },
        None => None,
    };
    Ok(ConsoleCommand::Read { target, rate })
}

/// Whether the loop keeps prompting
enum Flow {
    Continue,
    Exit,
}

/// Color styles for the console chrome
struct Styles {
    banner: Style,
    error: Style,
}

impl Styles {
    fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                banner: Style::new().magenta().bold(),
                error: Style::new().red(),
            }
        } else {
            Self {
                banner: Style::new(),
                error: Style::new(),
            }
        }
    }
}

/// Run the interactive console
pub async fn run(ctx: &Ctx) -> Result<()> {
    let use_color = atty::is(atty::Stream::Stdout);
    let styles = Styles::new(use_color);

    println!(
        "{}",
        format!("rill {}", env!("CARGO_PKG_VERSION")).style(styles.banner)
    );
    println!("Type 'help' for commands.");

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(ConsoleHelper));

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        // The editor blocks on the terminal; keep it off the runtime
        let (editor, line) = tokio::task::spawn_blocking(move || {
            let line = rl.readline("\n> ");
            (rl, line)
        })
        .await?;
        rl = editor;

        match line {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let Some(tokens) = shlex::split(trimmed) else {
                    println!("Invalid quoting.");
                    continue;
                };
                if tokens.is_empty() {
                    continue;
                }

                match ConsoleCommand::parse(&tokens) {
                    Ok(command) => {
                        if let Flow::Exit = execute(ctx, command, &styles).await {
                            break;
                        }
                    }
                    Err(usage) => println!("{usage}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: fresh prompt
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("Exiting.");
                break;
            }
            Err(e) => {
                println!("{}", format!("(error) {e}").style(styles.error));
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

/// Execute one parsed command; bus errors print and the console continues
async fn execute(ctx: &Ctx, command: ConsoleCommand, styles: &Styles) -> Flow {
    let result = match command {
        ConsoleCommand::Help => {
            print_help();
            Ok(())
        }
        ConsoleCommand::Exit => {
            println!("Exiting.");
            return Flow::Exit;
        }
        ConsoleCommand::List(mode) => super::list::run(ctx, mode).await,
        ConsoleCommand::Logs {
            window_secs,
            elements,
        } => {
            let elements: HashSet<String> = elements.into_iter().collect();
            super::logs::run(ctx, window_secs, &elements).await
        }
        ConsoleCommand::Command {
            element,
            command,
            payload,
        } => super::command::run(ctx, &element, &command, payload.as_deref()).await,
        ConsoleCommand::Read { target, rate } => super::read::run(ctx, &target, rate).await,
    };

    if let Err(e) = result {
        println!("{}", format!("(error) {e:#}").style(styles.error));
    }
    Flow::Continue
}

fn print_help() {
    println!("Available commands");
    println!("  list elements");
    println!("  list streams [element]");
    println!("  list commands <element>");
    println!("  logs [window_secs] [element ...]");
    println!("  command <element> <command> [payload]");
    println!("  read <element>:<stream> [rate]");
    println!("  help");
    println!("  exit");
}

fn history_file() -> Option<String> {
    std::env::var("HOME")
        .ok()
        .map(|h| format!("{}/.rill_history", h))
}

// =========================================================================
// TAB completion
// =========================================================================

struct ConsoleHelper;

impl Helper for ConsoleHelper {}
impl Validator for ConsoleHelper {}
impl Highlighter for ConsoleHelper {}
impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];
        let parts: Vec<&str> = line_to_pos.split_whitespace().collect();
        let trailing_space = line_to_pos.ends_with(' ');

        if parts.is_empty() || (parts.len() == 1 && !trailing_space) {
            // Completing the top-level command
            let prefix = parts.first().copied().unwrap_or("");
            let start = pos - prefix.len();
            Ok((start, candidates(COMMANDS, prefix)))
        } else if parts[0] == "list" && parts.len() == 1 {
            Ok((pos, candidates(LIST_MODES, "")))
        } else if parts[0] == "list" && parts.len() == 2 && !trailing_space {
            let prefix = parts[1];
            let start = pos - prefix.len();
            Ok((start, candidates(LIST_MODES, prefix)))
        } else {
            Ok((pos, vec![]))
        }
    }
}

fn candidates(options: &[&str], prefix: &str) -> Vec<Pair> {
    options
        .iter()
        .filter(|option| option.starts_with(prefix))
        .map(|option| Pair {
            display: option.to_string(),
            replacement: option.to_string(),
        })
        .collect()
}

#[cfg(test)]
#[path = "console_test.rs"]
mod tests;
