//! Error types for the bus crate

use std::io;
use thiserror::Error;

/// Errors that can occur when talking to the bus
#[derive(Error, Debug)]
pub enum BusError {
    /// I/O error (socket operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (malformed frames)
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection closed while requests were outstanding
    #[error("bus connection closed")]
    ConnectionClosed,

    /// No correlated response arrived within the exchange timeout
    #[error("no response within {ms}ms")]
    Timeout { ms: u64 },

    /// The bus does not know the addressed element
    #[error("no such element: {element}")]
    UnknownElement { element: String },

    /// The bus reported a fault serving a read
    #[error("store error: {0}")]
    Store(String),
}

/// Result type for bus operations
pub type Result<T> = std::result::Result<T, BusError>;
