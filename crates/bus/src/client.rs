//! Bus client - multiplexing Unix-socket connection to the bus daemon
//!
//! One connection serves every console operation. Requests carry a
//! client-assigned correlation id; a background reader task decodes reply
//! frames and resolves the matching waiter, so concurrent requests never
//! block behind each other.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tracing::debug;

use crate::entry::{CommandResponse, Entry};
use crate::error::{BusError, Result};
use crate::protocol::{ErrorKind, Reply, ReplyBody, Request, RequestBody, Start};

/// Default command-exchange timeout in milliseconds
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

struct Pending {
    /// Waiters keyed by correlation id; `None` once the connection is gone
    waiters: Mutex<Option<HashMap<u64, oneshot::Sender<ReplyBody>>>>,
}

impl Pending {
    fn new() -> Self {
        Self {
            waiters: Mutex::new(Some(HashMap::new())),
        }
    }

    fn register(&self, id: u64, tx: oneshot::Sender<ReplyBody>) -> Result<()> {
        match self.waiters.lock().as_mut() {
            Some(map) => {
                map.insert(id, tx);
                Ok(())
            }
            None => Err(BusError::ConnectionClosed),
        }
    }

    fn resolve(&self, id: u64) -> Option<oneshot::Sender<ReplyBody>> {
        self.waiters.lock().as_mut().and_then(|map| map.remove(&id))
    }

    fn abandon(&self, id: u64) {
        if let Some(map) = self.waiters.lock().as_mut() {
            map.remove(&id);
        }
    }

    /// Drop every waiter; their receivers observe the closed connection
    fn close(&self) {
        self.waiters.lock().take();
    }
}

struct ClientInner {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    next_id: AtomicU64,
    command_timeout: Duration,
}

/// Client handle for one bus connection
///
/// Cheap to clone; every clone shares the connection and the reader task.
#[derive(Clone)]
pub struct BusClient {
    inner: Arc<ClientInner>,
}

impl BusClient {
    /// Connect with the default command timeout
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::connect_with_timeout(path, Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS)).await
    }

    /// Connect with a caller-chosen command-exchange timeout
    pub async fn connect_with_timeout<P: AsRef<Path>>(
        path: P,
        command_timeout: Duration,
    ) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        let (read_half, write_half) = stream.into_split();

        let inner = Arc::new(ClientInner {
            writer: tokio::sync::Mutex::new(write_half),
            pending: Pending::new(),
            next_id: AtomicU64::new(1),
            command_timeout,
        });

        let reader_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            read_replies(read_half, reader_inner).await;
        });

        Ok(Self { inner })
    }

    /// Enumerate known elements
    pub async fn list_elements(&self) -> Result<Vec<String>> {
        match self.request(RequestBody::ListElements, None).await? {
            ReplyBody::Elements(names) => Ok(names),
            other => Err(unexpected(&other)),
        }
    }

    /// Enumerate stream ids, optionally scoped to one element
    pub async fn list_streams(&self, element: Option<&str>) -> Result<Vec<String>> {
        let body = RequestBody::ListStreams {
            element: element.map(str::to_string),
        };
        match self.request(body, None).await? {
            ReplyBody::Streams(names) => Ok(names),
            other => Err(unexpected(&other)),
        }
    }

    /// Range-read a stream from a start boundary through the present
    pub async fn range_read(&self, stream: &str, start: Start) -> Result<Vec<Entry>> {
        let body = RequestBody::RangeRead {
            stream: stream.to_string(),
            start,
        };
        match self.request(body, None).await? {
            ReplyBody::Entries(entries) => Ok(entries),
            other => Err(unexpected(&other)),
        }
    }

    /// Read the single newest entry of an element's stream
    ///
    /// `Ok(None)` means the stream has never been written - a normal
    /// outcome, not an error.
    pub async fn read_latest(&self, element: &str, stream: &str) -> Result<Option<Entry>> {
        let body = RequestBody::ReadLatest {
            element: element.to_string(),
            stream: stream.to_string(),
        };
        match self.request(body, None).await? {
            ReplyBody::Latest(entry) => Ok(entry),
            other => Err(unexpected(&other)),
        }
    }

    /// The store's current timestamp, in its own clock domain
    pub async fn server_time(&self) -> Result<u64> {
        match self.request(RequestBody::ServerTime, None).await? {
            ReplyBody::Time(ts) => Ok(ts),
            other => Err(unexpected(&other)),
        }
    }

    /// Publish a command envelope and wait for the correlated response
    ///
    /// The publish assigns the correlation id. An envelope with
    /// `err_code != 0` is an application-level failure and is returned as
    /// `Ok`; only transport faults, unknown targets, and the configured
    /// timeout produce an `Err`.
    pub async fn send_command(
        &self,
        element: &str,
        command: &str,
        payload: &[u8],
    ) -> Result<CommandResponse> {
        let body = RequestBody::Command {
            element: element.to_string(),
            command: command.to_string(),
            payload: payload.to_vec(),
        };
        let timeout = self.inner.command_timeout;
        match self.request(body, Some(timeout)).await? {
            ReplyBody::Response(resp) => Ok(resp),
            other => Err(unexpected(&other)),
        }
    }

    /// Issue one request and wait for its correlated reply
    async fn request(&self, body: RequestBody, timeout: Option<Duration>) -> Result<ReplyBody> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.inner.pending.register(id, tx)?;

        let frame = Request { id, body }.encode();
        {
            let mut writer = self.inner.writer.lock().await;
            if let Err(e) = writer.write_all(&frame).await {
                self.inner.pending.abandon(id);
                return Err(BusError::Io(e));
            }
        }

        let reply = match timeout {
            Some(window) => match tokio::time::timeout(window, rx).await {
                Ok(result) => result.map_err(|_| BusError::ConnectionClosed)?,
                Err(_) => {
                    self.inner.pending.abandon(id);
                    return Err(BusError::Timeout {
                        ms: window.as_millis() as u64,
                    });
                }
            },
            None => rx.await.map_err(|_| BusError::ConnectionClosed)?,
        };

        match reply {
            ReplyBody::Error { kind, message } => Err(match kind {
                ErrorKind::NoSuchElement => BusError::UnknownElement { element: message },
                ErrorKind::Store => BusError::Store(message),
            }),
            other => Ok(other),
        }
    }
}

/// Reader task: decode reply frames and resolve waiters by correlation id
async fn read_replies(mut read_half: tokio::net::unix::OwnedReadHalf, inner: Arc<ClientInner>) {
    let mut read_buf = BytesMut::with_capacity(64 * 1024);

    loop {
        // Drain complete frames from the buffer
        while read_buf.len() >= 4 {
            let len = u32::from_be_bytes([read_buf[0], read_buf[1], read_buf[2], read_buf[3]])
                as usize;
            if read_buf.len() < 4 + len {
                break;
            }
            read_buf.advance(4);
            let payload = read_buf.split_to(len).freeze();

            let reply = match Reply::decode(payload) {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(error = %e, "dropping bus connection on decode failure");
                    inner.pending.close();
                    return;
                }
            };

            match inner.pending.resolve(reply.id) {
                Some(tx) => {
                    // Receiver may have timed out; late responses are dropped
                    let _ = tx.send(reply.body);
                }
                None => {
                    debug!(id = reply.id, "ignoring reply with no pending request");
                }
            }
        }

        match read_half.read_buf(&mut read_buf).await {
            Ok(0) => {
                debug!("bus connection closed by peer");
                inner.pending.close();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "bus connection read error");
                inner.pending.close();
                return;
            }
        }
    }
}

fn unexpected(reply: &ReplyBody) -> BusError {
    BusError::Protocol(format!("unexpected reply: {reply:?}"))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
