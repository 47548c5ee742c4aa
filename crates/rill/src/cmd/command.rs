//! Command command - synchronous exchange with one element
//!
//! Publishes a command envelope and waits for the correlated response. A
//! response with `err_code != 0` is a failed command carried by a
//! successful exchange: it prints like any other envelope. Only transport
//! faults, unknown targets, and the configured timeout are errors.

use anyhow::Result;
use clap::Args;

use crate::output;

/// Command arguments
#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Target element
    pub element: String,

    /// Command name
    pub command: String,

    /// Optional payload handed to the command
    pub payload: Option<String>,
}

/// Run the command exchange and print the response envelope
pub async fn run(
    ctx: &super::Ctx,
    element: &str,
    command: &str,
    payload: Option<&str>,
) -> Result<()> {
    let payload = payload.unwrap_or("");
    let resp = ctx
        .client
        .send_command(element, command, payload.as_bytes())
        .await?;
    println!("{}", output::format_response(&resp));
    Ok(())
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
