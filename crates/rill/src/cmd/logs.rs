//! Logs command - query the shared log stream
//!
//! Computes the start boundary in the store's clock domain, issues one
//! range read, and filters by element on the client side. An empty result
//! is a normal outcome, reported as `No logs.` rather than an error.

use std::collections::HashSet;

use anyhow::Result;
use clap::Args;

use rill_bus::{BusClient, LogRecord, Start, LOG_STREAM};

use crate::output;

/// Logs command arguments
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Only records newer than this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub window: Option<u64>,

    /// Element names to keep (all elements when empty)
    #[arg(value_name = "ELEMENT")]
    pub elements: Vec<String>,
}

/// Run the logs command
pub async fn run(ctx: &super::Ctx, window_secs: Option<u64>, elements: &HashSet<String>) -> Result<()> {
    let records = query_logs(&ctx.client, window_secs, elements).await?;

    if records.is_empty() {
        println!("No logs.");
        return Ok(());
    }
    for record in &records {
        println!("{}", output::format_log(record));
    }
    Ok(())
}

/// Query the shared log stream
///
/// Returns records oldest-first, exactly as the range read delivers them.
/// An empty filter set means no filtering. Fetch errors surface unchanged;
/// nothing is retried here.
pub async fn query_logs(
    client: &BusClient,
    window_secs: Option<u64>,
    elements: &HashSet<String>,
) -> rill_bus::Result<Vec<LogRecord>> {
    let start = match window_secs {
        Some(window) => {
            let now = client.server_time().await?;
            start_boundary(now, window)
        }
        None => Start::Beginning,
    };

    let entries = client.range_read(LOG_STREAM, start).await?;
    let records = entries.iter().filter_map(LogRecord::from_entry).collect();
    Ok(filter_records(records, elements))
}

/// Start boundary for a lookback window, in the store's timestamp unit
fn start_boundary(store_now_ms: u64, window_secs: u64) -> Start {
    Start::At(store_now_ms.saturating_sub(window_secs.saturating_mul(1000)))
}

/// Keep records whose element is in the filter set; empty set keeps all
fn filter_records(records: Vec<LogRecord>, elements: &HashSet<String>) -> Vec<LogRecord> {
    if elements.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| elements.contains(&r.element))
        .collect()
}

#[cfg(test)]
#[path = "logs_test.rs"]
mod tests;
