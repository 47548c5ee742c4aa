//! Canonical rendering of log records, stream entries, and command responses
//!
//! Pure functions, no side effects. Log records render with a fixed field
//! order; entries keep their fields in producer write order with the
//! timestamp first. Binary field values render as Rust byte-string literals
//! (`b"..."`) so they stay distinguishable from fields that were text all
//! along.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use rill_bus::{CommandResponse, Entry, FieldValue, LogRecord};

/// Fixed-order log record view; serde emits struct fields in declaration
/// order, which is the canonical order here.
#[derive(Serialize)]
struct LogOutput<'a> {
    element: &'a str,
    timestamp: u64,
    level: String,
    msg: &'a str,
}

/// Render a log record as indented JSON
pub fn format_log(record: &LogRecord) -> String {
    let output = LogOutput {
        element: &record.element,
        timestamp: record.timestamp,
        level: record.level_str(),
        msg: &record.msg,
    };
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

/// Entry view: timestamp first, then fields in original order
struct EntryOutput<'a>(&'a Entry);

impl Serialize for EntryOutput<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.fields.len() + 1))?;
        map.serialize_entry("timestamp", &self.0.timestamp)?;
        for (name, value) in &self.0.fields {
            // The store id wins over any producer field of the same name
            if name == "timestamp" {
                continue;
            }
            map.serialize_entry(name, &FieldOutput(value))?;
        }
        map.end()
    }
}

struct FieldOutput<'a>(&'a FieldValue);

impl Serialize for FieldOutput<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Binary(b) => serializer.serialize_str(&byte_literal(b)),
        }
    }
}

/// Render a stream entry as indented JSON
pub fn format_entry(entry: &Entry) -> String {
    serde_json::to_string_pretty(&EntryOutput(entry)).unwrap_or_default()
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    err_code: i64,
    err_str: &'a str,
    data: String,
}

/// Render a command response envelope as indented JSON
///
/// The opaque payload follows the field-value rules: UTF-8 stays text,
/// anything else becomes a byte-string literal.
pub fn format_response(resp: &CommandResponse) -> String {
    let data = match std::str::from_utf8(&resp.data) {
        Ok(s) => s.to_string(),
        Err(_) => byte_literal(&resp.data),
    };
    let output = ResponseOutput {
        err_code: resp.err_code,
        err_str: &resp.err_str,
        data,
    };
    serde_json::to_string_pretty(&output).unwrap_or_default()
}

/// Escape bytes as a Rust byte-string literal
fn byte_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 4);
    out.push_str("b\"");
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7E => out.push(b as char),
            _ => {
                out.push_str(&format!("\\x{b:02x}"));
            }
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
#[path = "output_test.rs"]
mod tests;
