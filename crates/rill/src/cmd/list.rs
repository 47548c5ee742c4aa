//! List command - enumerate elements, streams, or an element's commands
//!
//! Elements and streams come straight from the bus. Command names ride the
//! Command Exchange: the reserved `command_list` command asks the element
//! itself, so the listing reflects what it actually answers.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use rill_bus::COMMAND_LIST;

use crate::output;

/// List command arguments
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(subcommand)]
    pub mode: ListMode,
}

/// What to enumerate
#[derive(Subcommand, Debug, PartialEq)]
pub enum ListMode {
    /// Enumerate known elements
    Elements,

    /// Enumerate streams, optionally scoped to one element
    Streams {
        /// Element to scope to
        element: Option<String>,
    },

    /// List the commands an element answers
    Commands {
        /// Element to ask
        element: String,
    },
}

/// Run the list command
pub async fn run(ctx: &super::Ctx, mode: ListMode) -> Result<()> {
    match mode {
        ListMode::Elements => {
            let items = ctx.client.list_elements().await?;
            print_items("elements", &items);
        }
        ListMode::Streams { element } => {
            let items = ctx.client.list_streams(element.as_deref()).await?;
            print_items("streams", &items);
        }
        ListMode::Commands { element } => {
            let resp = ctx.client.send_command(&element, COMMAND_LIST, b"").await?;
            if !resp.is_ok() {
                // The element refused; show the envelope as-is
                println!("{}", output::format_response(&resp));
                return Ok(());
            }
            let items: Vec<String> = serde_json::from_slice(&resp.data)
                .with_context(|| format!("malformed command list from {element}"))?;
            print_items("commands", &items);
        }
    }
    Ok(())
}

fn print_items(kind: &str, items: &[String]) {
    if items.is_empty() {
        println!("No {kind} exist.");
        return;
    }
    for item in items {
        println!("{item}");
    }
}

#[cfg(test)]
#[path = "list_test.rs"]
mod tests;
