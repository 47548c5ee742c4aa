//! Bus data model: entries, log records, command responses
//!
//! An element owns zero or more append-only streams. Each stream position is
//! an [`Entry`]: a store-assigned timestamp plus named fields in the order
//! the producer wrote them. The shared [`LOG_STREAM`] carries structured
//! diagnostics from every element as [`LogRecord`]s.

/// Name of the shared diagnostic stream all elements log into.
pub const LOG_STREAM: &str = "log";

/// A field value, kept distinguishable for display: text stays text,
/// binary is rendered as a byte-string literal by the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Borrow as text if this value is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Binary(_) => None,
        }
    }

    /// Raw bytes of the value regardless of kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FieldValue::Text(s) => s.as_bytes(),
            FieldValue::Binary(b) => b,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Binary(b)
    }
}

/// One timestamped record of a stream
///
/// `timestamp` is assigned by the store: monotonically non-decreasing and
/// unique within its stream, in the store's millisecond-scale unit. Field
/// order is preserved end to end so display matches what the producer wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Store-assigned identifier, unique within the stream
    pub timestamp: u64,
    /// Named fields in original write order
    pub fields: Vec<(String, FieldValue)>,
}

impl Entry {
    /// Create an entry from a timestamp and fields
    pub fn new(timestamp: u64, fields: Vec<(String, FieldValue)>) -> Self {
        Self { timestamp, fields }
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Look up a text field by name
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }
}

/// Syslog-style severity carried by log records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    /// Map a numeric severity to a known level
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Emergency),
            1 => Some(Self::Alert),
            2 => Some(Self::Critical),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::Notice),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }

    /// Numeric severity
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::Alert => 1,
            Self::Critical => 2,
            Self::Error => 3,
            Self::Warning => 4,
            Self::Notice => 5,
            Self::Info => 6,
            Self::Debug => 7,
        }
    }

    /// Symbolic name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emerg",
            Self::Alert => "alert",
            Self::Critical => "crit",
            Self::Error => "err",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    fn from_str_symbolic(s: &str) -> Option<u8> {
        let level = match s {
            "emerg" | "emergency" => Self::Emergency,
            "alert" => Self::Alert,
            "crit" | "critical" => Self::Critical,
            "err" | "error" => Self::Error,
            "warning" | "warn" => Self::Warning,
            "notice" => Self::Notice,
            "info" => Self::Info,
            "debug" => Self::Debug,
            _ => return None,
        };
        Some(level.as_u8())
    }
}

/// A structured diagnostic record from the shared log stream
///
/// Every log record belongs to exactly one element. `level` stays numeric so
/// severities outside the known range are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Producing element name
    pub element: String,
    /// Store-assigned identifier within the log stream
    pub timestamp: u64,
    /// Numeric severity (0 emergency .. 7 debug; unknown values pass through)
    pub level: u8,
    /// Message text
    pub msg: String,
}

impl LogRecord {
    /// Decode a log-stream entry into a record
    ///
    /// Returns `None` when a mandatory field is missing or unreadable;
    /// such entries do not belong to any element and are skipped upstream.
    pub fn from_entry(entry: &Entry) -> Option<Self> {
        let element = entry.text("element")?.to_string();
        let msg = entry.text("msg")?.to_string();
        let level_field = entry.get("level")?;
        let level = match level_field {
            FieldValue::Text(s) => match s.parse::<u8>() {
                Ok(n) => n,
                Err(_) => LogLevel::from_str_symbolic(s)?,
            },
            FieldValue::Binary(_) => return None,
        };
        Some(Self {
            element,
            timestamp: entry.timestamp,
            level,
            msg,
        })
    }

    /// Symbolic rendering of the severity, falling back to the number
    pub fn level_str(&self) -> String {
        match LogLevel::from_u8(self.level) {
            Some(l) => l.as_str().to_string(),
            None => self.level.to_string(),
        }
    }
}

/// Response envelope returned by a command exchange
///
/// `err_code != 0` is an application-level failure reported by the target
/// element. That is data, not a transport error: the exchange itself
/// succeeded and the envelope is returned as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResponse {
    /// 0 on success, element-defined otherwise
    pub err_code: i64,
    /// Human-readable failure description, empty on success
    pub err_str: String,
    /// Opaque result payload
    pub data: Vec<u8>,
}

impl CommandResponse {
    /// Successful response carrying a payload
    pub fn ok(data: impl Into<Vec<u8>>) -> Self {
        Self {
            err_code: 0,
            err_str: String::new(),
            data: data.into(),
        }
    }

    /// Failed response with a code and message
    pub fn err(err_code: i64, err_str: impl Into<String>) -> Self {
        Self {
            err_code,
            err_str: err_str.into(),
            data: Vec::new(),
        }
    }

    /// Whether the target element reported success
    pub fn is_ok(&self) -> bool {
        self.err_code == 0
    }
}

#[cfg(test)]
#[path = "entry_test.rs"]
mod tests;
