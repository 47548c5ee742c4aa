//! Rill bus client library
//!
//! Client-side plumbing for the rill message bus: elements publish
//! append-only streams of timestamped entries plus a shared `log` stream,
//! and answer synchronous commands. This crate provides:
//!
//! - [`entry`] - Entries, log records, and command response envelopes
//! - [`protocol`] - Length-prefixed wire messages with correlation ids
//! - [`client`] - [`BusClient`], a multiplexing Unix-socket client
//! - [`membus`] - An in-process bus serving the same protocol, used by
//!   tests and local demos in place of a real bus daemon
//!
//! # Quick Start
//!
//! ```ignore
//! use rill_bus::{BusClient, Start};
//!
//! let client = BusClient::connect("/tmp/rill-bus.sock").await?;
//! let entries = client.range_read("log", Start::Beginning).await?;
//! let latest = client.read_latest("camera", "frames").await?;
//! let resp = client.send_command("robot", "wave", b"").await?;
//! ```

pub mod client;
pub mod entry;
pub mod error;
pub mod membus;
pub mod protocol;

pub use client::{BusClient, DEFAULT_COMMAND_TIMEOUT_MS};
pub use entry::{CommandResponse, Entry, FieldValue, LogLevel, LogRecord, LOG_STREAM};
pub use error::{BusError, Result};
pub use membus::MemBus;
pub use protocol::{ErrorKind, Reply, ReplyBody, Request, RequestBody, Start, COMMAND_LIST};
