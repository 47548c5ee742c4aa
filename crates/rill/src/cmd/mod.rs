//! Console commands
//!
//! Each module owns one operation: argument types for the one-shot CLI,
//! the engine logic, and the printing front shared with the interactive
//! console.

pub mod command;
pub mod console;
pub mod list;
pub mod logs;
pub mod read;

use rill_bus::BusClient;

/// Shared state handed to every command
pub struct Ctx {
    /// Connected bus client
    pub client: BusClient,
    /// Poll rate applied when `read` is issued without one
    pub default_rate: Option<f64>,
}
