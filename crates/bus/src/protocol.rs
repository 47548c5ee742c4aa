//! Wire protocol between the console client and the bus daemon
//!
//! Uses a simple length-prefixed binary format so non-Rust clients can
//! speak it without a Rust-specific codec.
//!
//! # Wire Format
//!
//! All messages are length-prefixed:
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬──────────────────────┐
//! │ 4 bytes      │ 1 byte       │ 8 bytes      │ N bytes              │
//! │ length (BE)  │ message type │ request id   │ body                 │
//! └──────────────┴──────────────┴──────────────┴──────────────────────┘
//! ```
//!
//! The request id is a client-assigned correlation id echoed by the reply,
//! so replies can be routed out of order over one connection.
//!
//! # Message Types
//!
//! Client → Server: `ListElements` (0x01), `ListStreams` (0x02),
//! `RangeRead` (0x03), `ReadLatest` (0x04), `Command` (0x05),
//! `ServerTime` (0x06).
//!
//! Server → Client: `Elements` (0x81), `Streams` (0x82), `Entries` (0x83),
//! `Latest` (0x84), `Response` (0x85), `Time` (0x86), `Error` (0xFF).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::entry::{CommandResponse, Entry, FieldValue};
use crate::error::{BusError, Result};

/// Reserved command name: ask an element for the commands it supports.
pub const COMMAND_LIST: &str = "command_list";

const MSG_LIST_ELEMENTS: u8 = 0x01;
const MSG_LIST_STREAMS: u8 = 0x02;
const MSG_RANGE_READ: u8 = 0x03;
const MSG_READ_LATEST: u8 = 0x04;
const MSG_COMMAND: u8 = 0x05;
const MSG_SERVER_TIME: u8 = 0x06;

const MSG_ELEMENTS: u8 = 0x81;
const MSG_STREAMS: u8 = 0x82;
const MSG_ENTRIES: u8 = 0x83;
const MSG_LATEST: u8 = 0x84;
const MSG_RESPONSE: u8 = 0x85;
const MSG_TIME: u8 = 0x86;
const MSG_ERROR: u8 = 0xFF;

const FIELD_TEXT: u8 = 0;
const FIELD_BINARY: u8 = 1;

const START_BEGINNING: u8 = 0;
const START_AT: u8 = 1;

/// Start boundary of a range read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// From the earliest available entry (the `-` boundary)
    Beginning,
    /// From the given timestamp, inclusive
    At(u64),
}

/// Error categories a reply can carry
///
/// `NoSuchElement` keeps command-exchange failures distinguishable from
/// general store faults on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Addressed element is unknown to the bus; the message carries its name
    NoSuchElement,
    /// The store failed serving the request
    Store,
}

impl ErrorKind {
    fn to_u8(self) -> u8 {
        match self {
            ErrorKind::NoSuchElement => 1,
            ErrorKind::Store => 2,
        }
    }

    fn from_u8(v: u8) -> Result<Self> {
        match v {
            1 => Ok(ErrorKind::NoSuchElement),
            2 => Ok(ErrorKind::Store),
            _ => Err(BusError::Protocol(format!("unknown error kind: {v}"))),
        }
    }
}

/// Request body, one variant per client → server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Enumerate known elements
    ListElements,
    /// Enumerate streams, optionally scoped to one element
    ListStreams { element: Option<String> },
    /// Range-read a stream from a start boundary through the present
    RangeRead { stream: String, start: Start },
    /// Read the single newest entry of an element's stream
    ReadLatest { element: String, stream: String },
    /// Publish a command envelope to an element
    Command {
        element: String,
        command: String,
        payload: Vec<u8>,
    },
    /// Ask for the store's current timestamp
    ServerTime,
}

/// A framed request with its correlation id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: u64,
    pub body: RequestBody,
}

/// Reply body, one variant per server → client message
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Elements(Vec<String>),
    Streams(Vec<String>),
    Entries(Vec<Entry>),
    Latest(Option<Entry>),
    Response(CommandResponse),
    Time(u64),
    Error { kind: ErrorKind, message: String },
}

/// A framed reply echoing the request's correlation id
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: u64,
    pub body: ReplyBody,
}

impl Request {
    /// Encode to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u32(0); // length, patched below

        match &self.body {
            RequestBody::ListElements => {
                buf.put_u8(MSG_LIST_ELEMENTS);
                buf.put_u64(self.id);
            }
            RequestBody::ListStreams { element } => {
                buf.put_u8(MSG_LIST_STREAMS);
                buf.put_u64(self.id);
                encode_option_string(element.as_deref(), &mut buf);
            }
            RequestBody::RangeRead { stream, start } => {
                buf.put_u8(MSG_RANGE_READ);
                buf.put_u64(self.id);
                encode_string(stream, &mut buf);
                encode_start(*start, &mut buf);
            }
            RequestBody::ReadLatest { element, stream } => {
                buf.put_u8(MSG_READ_LATEST);
                buf.put_u64(self.id);
                encode_string(element, &mut buf);
                encode_string(stream, &mut buf);
            }
            RequestBody::Command {
                element,
                command,
                payload,
            } => {
                buf.put_u8(MSG_COMMAND);
                buf.put_u64(self.id);
                encode_string(element, &mut buf);
                encode_string(command, &mut buf);
                encode_bytes(payload, &mut buf);
            }
            RequestBody::ServerTime => {
                buf.put_u8(MSG_SERVER_TIME);
                buf.put_u64(self.id);
            }
        }

        patch_length(&mut buf);
        buf.freeze()
    }

    /// Decode from bytes (after the length prefix has been stripped)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.remaining() < 9 {
            return Err(BusError::Protocol("truncated request header".into()));
        }
        let msg_type = buf.get_u8();
        let id = buf.get_u64();

        let body = match msg_type {
            MSG_LIST_ELEMENTS => RequestBody::ListElements,
            MSG_LIST_STREAMS => RequestBody::ListStreams {
                element: decode_option_string(&mut buf)?,
            },
            MSG_RANGE_READ => RequestBody::RangeRead {
                stream: decode_string(&mut buf)?,
                start: decode_start(&mut buf)?,
            },
            MSG_READ_LATEST => RequestBody::ReadLatest {
                element: decode_string(&mut buf)?,
                stream: decode_string(&mut buf)?,
            },
            MSG_COMMAND => RequestBody::Command {
                element: decode_string(&mut buf)?,
                command: decode_string(&mut buf)?,
                payload: decode_bytes(&mut buf)?,
            },
            MSG_SERVER_TIME => RequestBody::ServerTime,
            _ => {
                return Err(BusError::Protocol(format!(
                    "unknown request type: {msg_type}"
                )))
            }
        };

        Ok(Request { id, body })
    }
}

impl Reply {
    /// Encode to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(128);
        buf.put_u32(0); // length, patched below

        match &self.body {
            ReplyBody::Elements(names) => {
                buf.put_u8(MSG_ELEMENTS);
                buf.put_u64(self.id);
                encode_string_vec(names, &mut buf);
            }
            ReplyBody::Streams(names) => {
                buf.put_u8(MSG_STREAMS);
                buf.put_u64(self.id);
                encode_string_vec(names, &mut buf);
            }
            ReplyBody::Entries(entries) => {
                buf.put_u8(MSG_ENTRIES);
                buf.put_u64(self.id);
                buf.put_u32(entries.len() as u32);
                for entry in entries {
                    encode_entry(entry, &mut buf);
                }
            }
            ReplyBody::Latest(entry) => {
                buf.put_u8(MSG_LATEST);
                buf.put_u64(self.id);
                match entry {
                    Some(e) => {
                        buf.put_u8(1);
                        encode_entry(e, &mut buf);
                    }
                    None => buf.put_u8(0),
                }
            }
            ReplyBody::Response(resp) => {
                buf.put_u8(MSG_RESPONSE);
                buf.put_u64(self.id);
                buf.put_i64(resp.err_code);
                encode_string(&resp.err_str, &mut buf);
                encode_bytes(&resp.data, &mut buf);
            }
            ReplyBody::Time(ts) => {
                buf.put_u8(MSG_TIME);
                buf.put_u64(self.id);
                buf.put_u64(*ts);
            }
            ReplyBody::Error { kind, message } => {
                buf.put_u8(MSG_ERROR);
                buf.put_u64(self.id);
                buf.put_u8(kind.to_u8());
                encode_string(message, &mut buf);
            }
        }

        patch_length(&mut buf);
        buf.freeze()
    }

    /// Decode from bytes (after the length prefix has been stripped)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.remaining() < 9 {
            return Err(BusError::Protocol("truncated reply header".into()));
        }
        let msg_type = buf.get_u8();
        let id = buf.get_u64();

        let body = match msg_type {
            MSG_ELEMENTS => ReplyBody::Elements(decode_string_vec(&mut buf)?),
            MSG_STREAMS => ReplyBody::Streams(decode_string_vec(&mut buf)?),
            MSG_ENTRIES => {
                if buf.remaining() < 4 {
                    return Err(BusError::Protocol("truncated entry count".into()));
                }
                let count = buf.get_u32() as usize;
                let mut entries = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    entries.push(decode_entry(&mut buf)?);
                }
                ReplyBody::Entries(entries)
            }
            MSG_LATEST => {
                if buf.remaining() < 1 {
                    return Err(BusError::Protocol("truncated latest flag".into()));
                }
                match buf.get_u8() {
                    0 => ReplyBody::Latest(None),
                    1 => ReplyBody::Latest(Some(decode_entry(&mut buf)?)),
                    v => {
                        return Err(BusError::Protocol(format!("invalid latest flag: {v}")));
                    }
                }
            }
            MSG_RESPONSE => {
                if buf.remaining() < 8 {
                    return Err(BusError::Protocol("truncated response".into()));
                }
                let err_code = buf.get_i64();
                let err_str = decode_string(&mut buf)?;
                let data = decode_bytes(&mut buf)?;
                ReplyBody::Response(CommandResponse {
                    err_code,
                    err_str,
                    data,
                })
            }
            MSG_TIME => {
                if buf.remaining() < 8 {
                    return Err(BusError::Protocol("truncated time".into()));
                }
                ReplyBody::Time(buf.get_u64())
            }
            MSG_ERROR => {
                if buf.remaining() < 1 {
                    return Err(BusError::Protocol("truncated error kind".into()));
                }
                let kind = ErrorKind::from_u8(buf.get_u8())?;
                let message = decode_string(&mut buf)?;
                ReplyBody::Error { kind, message }
            }
            _ => {
                return Err(BusError::Protocol(format!(
                    "unknown reply type: {msg_type}"
                )))
            }
        };

        Ok(Reply { id, body })
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn patch_length(buf: &mut BytesMut) {
    let len = (buf.len() - 4) as u32;
    buf[0..4].copy_from_slice(&len.to_be_bytes());
}

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes) -> Result<String> {
    let bytes = decode_bytes(buf)?;
    String::from_utf8(bytes).map_err(|e| BusError::Protocol(format!("invalid UTF-8: {e}")))
}

fn encode_bytes(b: &[u8], buf: &mut BytesMut) {
    buf.put_u32(b.len() as u32);
    buf.put_slice(b);
}

fn decode_bytes(buf: &mut Bytes) -> Result<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(BusError::Protocol("truncated length".into()));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(BusError::Protocol("truncated bytes".into()));
    }
    Ok(buf.split_to(len).to_vec())
}

fn encode_option_string(opt: Option<&str>, buf: &mut BytesMut) {
    match opt {
        Some(s) => {
            buf.put_u8(1);
            encode_string(s, buf);
        }
        None => buf.put_u8(0),
    }
}

fn decode_option_string(buf: &mut Bytes) -> Result<Option<String>> {
    if buf.remaining() < 1 {
        return Err(BusError::Protocol("truncated option".into()));
    }
    if buf.get_u8() == 0 {
        return Ok(None);
    }
    Ok(Some(decode_string(buf)?))
}

fn encode_string_vec(v: &[String], buf: &mut BytesMut) {
    buf.put_u32(v.len() as u32);
    for s in v {
        encode_string(s, buf);
    }
}

fn decode_string_vec(buf: &mut Bytes) -> Result<Vec<String>> {
    if buf.remaining() < 4 {
        return Err(BusError::Protocol("truncated vec length".into()));
    }
    let len = buf.get_u32() as usize;
    let mut v = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        v.push(decode_string(buf)?);
    }
    Ok(v)
}

fn encode_start(start: Start, buf: &mut BytesMut) {
    match start {
        Start::Beginning => buf.put_u8(START_BEGINNING),
        Start::At(ts) => {
            buf.put_u8(START_AT);
            buf.put_u64(ts);
        }
    }
}

fn decode_start(buf: &mut Bytes) -> Result<Start> {
    if buf.remaining() < 1 {
        return Err(BusError::Protocol("truncated start boundary".into()));
    }
    match buf.get_u8() {
        START_BEGINNING => Ok(Start::Beginning),
        START_AT => {
            if buf.remaining() < 8 {
                return Err(BusError::Protocol("truncated start timestamp".into()));
            }
            Ok(Start::At(buf.get_u64()))
        }
        v => Err(BusError::Protocol(format!("invalid start boundary: {v}"))),
    }
}

fn encode_entry(entry: &Entry, buf: &mut BytesMut) {
    buf.put_u64(entry.timestamp);
    buf.put_u32(entry.fields.len() as u32);
    for (name, value) in &entry.fields {
        encode_string(name, buf);
        match value {
            FieldValue::Text(s) => {
                buf.put_u8(FIELD_TEXT);
                encode_string(s, buf);
            }
            FieldValue::Binary(b) => {
                buf.put_u8(FIELD_BINARY);
                encode_bytes(b, buf);
            }
        }
    }
}

fn decode_entry(buf: &mut Bytes) -> Result<Entry> {
    if buf.remaining() < 12 {
        return Err(BusError::Protocol("truncated entry".into()));
    }
    let timestamp = buf.get_u64();
    let count = buf.get_u32() as usize;
    let mut fields = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let name = decode_string(buf)?;
        if buf.remaining() < 1 {
            return Err(BusError::Protocol("truncated field tag".into()));
        }
        let value = match buf.get_u8() {
            FIELD_TEXT => FieldValue::Text(decode_string(buf)?),
            FIELD_BINARY => FieldValue::Binary(decode_bytes(buf)?),
            v => {
                return Err(BusError::Protocol(format!("invalid field tag: {v}")));
            }
        };
        fields.push((name, value));
    }
    Ok(Entry { timestamp, fields })
}

/// Read a 4-byte length prefix, if present
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
