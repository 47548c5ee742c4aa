//! In-process bus speaking the wire protocol over a Unix socket
//!
//! `MemBus` stands in for the bus daemon, which this crate only consumes.
//! It holds streams in memory, answers the full request set, and dispatches
//! registered command handlers. Tests and local demos run the real
//! [`BusClient`](crate::client::BusClient) against it.
//!
//! The clock is logical: it only moves through [`MemBus::set_time`] and
//! [`MemBus::advance_time`], so window queries are deterministic.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

use crate::entry::{CommandResponse, Entry, FieldValue, LOG_STREAM};
use crate::error::Result;
use crate::protocol::{
    read_length_prefix, ErrorKind, Reply, ReplyBody, Request, RequestBody, Start, COMMAND_LIST,
};

/// Application-level error code for a command the element does not support
pub const ERR_UNSUPPORTED_COMMAND: i64 = 2;

/// Handler invoked for one command exchange
pub type CommandHandler = Arc<dyn Fn(&[u8]) -> CommandResponse + Send + Sync>;

#[derive(Default)]
struct ElementState {
    handlers: HashMap<String, CommandHandler>,
    /// When false, commands to this element are swallowed without a reply
    /// (used to exercise client timeouts)
    responsive: bool,
}

struct BusState {
    /// Streams keyed by wire stream id (`element:stream`, or the bare
    /// shared log stream)
    streams: Mutex<HashMap<String, Vec<Entry>>>,
    elements: Mutex<HashMap<String, ElementState>>,
    clock_ms: AtomicU64,
}

/// In-memory bus server
#[derive(Clone)]
pub struct MemBus {
    state: Arc<BusState>,
}

impl Default for MemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(BusState {
                streams: Mutex::new(HashMap::new()),
                elements: Mutex::new(HashMap::new()),
                clock_ms: AtomicU64::new(1),
            }),
        }
    }

    /// Pin the store clock to an absolute millisecond value
    pub fn set_time(&self, ms: u64) {
        self.state.clock_ms.store(ms, Ordering::Relaxed);
    }

    /// Move the store clock forward
    pub fn advance_time(&self, ms: u64) {
        self.state.clock_ms.fetch_add(ms, Ordering::Relaxed);
    }

    fn now(&self) -> u64 {
        self.state.clock_ms.load(Ordering::Relaxed)
    }

    /// Register an element that answers commands
    pub fn register_element(&self, name: &str) {
        self.state
            .elements
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| ElementState {
                handlers: HashMap::new(),
                responsive: true,
            });
    }

    /// Register an element whose commands are accepted but never answered
    pub fn register_mute_element(&self, name: &str) {
        self.state.elements.lock().insert(
            name.to_string(),
            ElementState {
                handlers: HashMap::new(),
                responsive: false,
            },
        );
    }

    /// Attach a command handler to an element, registering it if needed
    pub fn add_command<F>(&self, element: &str, command: &str, handler: F)
    where
        F: Fn(&[u8]) -> CommandResponse + Send + Sync + 'static,
    {
        let mut elements = self.state.elements.lock();
        let state = elements
            .entry(element.to_string())
            .or_insert_with(|| ElementState {
                handlers: HashMap::new(),
                responsive: true,
            });
        state
            .handlers
            .insert(command.to_string(), Arc::new(handler));
    }

    /// Append an entry to an element's stream, assigning the timestamp
    /// from the store clock (bumped past the stream's last id if needed)
    pub fn append(&self, element: &str, stream: &str, fields: Vec<(String, FieldValue)>) -> u64 {
        let id = stream_id(element, stream);
        let mut streams = self.state.streams.lock();
        let entries = streams.entry(id).or_default();
        let ts = match entries.last() {
            Some(last) => self.now().max(last.timestamp + 1),
            None => self.now(),
        };
        entries.push(Entry::new(ts, fields));
        ts
    }

    /// Append with an explicit timestamp (test seeding)
    pub fn append_at(
        &self,
        element: &str,
        stream: &str,
        timestamp: u64,
        fields: Vec<(String, FieldValue)>,
    ) {
        let id = stream_id(element, stream);
        self.state
            .streams
            .lock()
            .entry(id)
            .or_default()
            .push(Entry::new(timestamp, fields));
    }

    /// Write a record to the shared log stream
    pub fn log(&self, element: &str, level: u8, msg: &str) -> u64 {
        let mut streams = self.state.streams.lock();
        let entries = streams.entry(LOG_STREAM.to_string()).or_default();
        let ts = match entries.last() {
            Some(last) => self.now().max(last.timestamp + 1),
            None => self.now(),
        };
        entries.push(Entry::new(ts, log_fields(element, level, msg)));
        ts
    }

    /// Write a log record with an explicit timestamp (test seeding)
    pub fn log_at(&self, timestamp: u64, element: &str, level: u8, msg: &str) {
        self.state
            .streams
            .lock()
            .entry(LOG_STREAM.to_string())
            .or_default()
            .push(Entry::new(timestamp, log_fields(element, level, msg)));
    }

    /// Serve connections on the given socket path until aborted
    pub async fn serve<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        debug!(path = %path.display(), "mem bus listening");

        loop {
            let (stream, _addr) = listener.accept().await?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, state).await {
                    debug!(error = %e, "bus connection ended");
                }
            });
        }
    }

    /// Serve in a background task
    pub fn spawn<P: AsRef<Path>>(&self, path: P) -> tokio::task::JoinHandle<Result<()>> {
        let bus = self.clone();
        let path = path.as_ref().to_path_buf();
        tokio::spawn(async move { bus.serve(path).await })
    }
}

fn stream_id(element: &str, stream: &str) -> String {
    format!("{element}:{stream}")
}

fn log_fields(element: &str, level: u8, msg: &str) -> Vec<(String, FieldValue)> {
    vec![
        ("element".to_string(), FieldValue::Text(element.to_string())),
        ("level".to_string(), FieldValue::Text(level.to_string())),
        ("msg".to_string(), FieldValue::Text(msg.to_string())),
    ]
}

async fn handle_connection(mut stream: UnixStream, state: Arc<BusState>) -> Result<()> {
    loop {
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let len = match read_length_prefix(&len_buf) {
            Some(len) => len as usize,
            None => return Ok(()),
        };

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;
        let request = Request::decode(payload.into())?;

        match answer(&state, request) {
            Some(reply) => stream.write_all(&reply.encode()).await?,
            None => {} // mute element: swallow without replying
        }
    }
}

/// Compute the reply for one request; `None` means deliberately no reply
fn answer(state: &BusState, request: Request) -> Option<Reply> {
    let id = request.id;
    let body = match request.body {
        RequestBody::ListElements => {
            let mut names: Vec<String> = state.elements.lock().keys().cloned().collect();
            for stream in state.streams.lock().keys() {
                if let Some((element, _)) = stream.split_once(':') {
                    if !names.iter().any(|n| n == element) {
                        names.push(element.to_string());
                    }
                }
            }
            names.sort();
            ReplyBody::Elements(names)
        }
        RequestBody::ListStreams { element } => {
            let mut names: Vec<String> = state
                .streams
                .lock()
                .keys()
                .filter(|s| s.contains(':'))
                .filter(|s| match &element {
                    Some(e) => s.split_once(':').map(|(el, _)| el == e).unwrap_or(false),
                    None => true,
                })
                .cloned()
                .collect();
            names.sort();
            ReplyBody::Streams(names)
        }
        RequestBody::RangeRead { stream, start } => {
            let streams = state.streams.lock();
            let entries = match streams.get(&stream) {
                Some(entries) => {
                    let from = match start {
                        Start::Beginning => 0,
                        Start::At(ts) => ts,
                    };
                    entries
                        .iter()
                        .filter(|e| e.timestamp >= from)
                        .cloned()
                        .collect()
                }
                None => Vec::new(),
            };
            ReplyBody::Entries(entries)
        }
        RequestBody::ReadLatest { element, stream } => {
            let key = stream_id(&element, &stream);
            let streams = state.streams.lock();
            ReplyBody::Latest(streams.get(&key).and_then(|e| e.last().cloned()))
        }
        RequestBody::Command {
            element,
            command,
            payload,
        } => {
            // Resolve under the lock, run the handler outside it so handlers
            // may call back into the bus
            enum Action {
                Unknown,
                Mute,
                Respond(CommandResponse),
                Run(CommandHandler),
            }

            let action = {
                let elements = state.elements.lock();
                match elements.get(&element) {
                    None => Action::Unknown,
                    Some(elem) if !elem.responsive => Action::Mute,
                    Some(elem) => match elem.handlers.get(&command) {
                        // A registered handler wins, even for the reserved name
                        Some(handler) => Action::Run(Arc::clone(handler)),
                        None if command == COMMAND_LIST => {
                            let mut names: Vec<&String> = elem.handlers.keys().collect();
                            names.sort();
                            let response = match serde_json::to_vec(&names) {
                                Ok(data) => CommandResponse::ok(data),
                                Err(e) => {
                                    CommandResponse::err(1, format!("command list failed: {e}"))
                                }
                            };
                            Action::Respond(response)
                        }
                        None => Action::Respond(CommandResponse::err(
                            ERR_UNSUPPORTED_COMMAND,
                            format!("unsupported command: {command}"),
                        )),
                    },
                }
            };

            match action {
                Action::Unknown => ReplyBody::Error {
                    kind: ErrorKind::NoSuchElement,
                    message: element,
                },
                Action::Mute => return None,
                Action::Respond(response) => ReplyBody::Response(response),
                Action::Run(handler) => ReplyBody::Response(handler(&payload)),
            }
        }
        RequestBody::ServerTime => ReplyBody::Time(state.clock_ms.load(Ordering::Relaxed)),
    };
    Some(Reply { id, body })
}
