//! Read command - follow the newest entry of a stream
//!
//! Polls the newest entry of `element:stream`, deduplicates by timestamp,
//! and paces polls to an optional rate bound. The loop runs as a background
//! task emitting into a channel, with an explicit stop signal, so the
//! console observes cancellation promptly.
//!
//! Polling "newest" rather than cursoring through a range keeps the loop
//! correct against a store that only guarantees a latest-value read; the
//! timestamp dedup keeps a fast poller from re-printing an unchanged entry.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use rill_bus::{BusClient, BusError, Entry};

use crate::output;

/// Read command arguments
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Stream to follow, as element:stream
    #[arg(value_name = "ELEMENT:STREAM")]
    pub target: String,

    /// Max polls per second
    #[arg(short, long, value_name = "HZ")]
    pub rate: Option<f64>,
}

/// One observation from the tail task
#[derive(Debug)]
pub enum TailEvent {
    /// A newly observed entry
    Entry(Entry),
    /// The stream has never been written; terminal, not an error
    NoData { element: String, stream: String },
    /// A fetch failed; terminal
    Failed(BusError),
}

/// Handle to a running tail task
pub struct TailHandle {
    /// Observed changes, in strictly increasing timestamp order
    pub events: mpsc::Receiver<TailEvent>,
    stop: watch::Sender<bool>,
}

impl TailHandle {
    /// Ask the task to stop; it winds down at its next suspension point
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// Spawn the tail loop for one stream
pub fn spawn_tail(
    client: BusClient,
    element: String,
    stream: String,
    rate: Option<f64>,
) -> TailHandle {
    let (event_tx, events) = mpsc::channel(64);
    let (stop, mut stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut cursor = TailCursor::new();

        loop {
            let poll_start = Instant::now();

            match client.read_latest(&element, &stream).await {
                Ok(None) => {
                    let _ = event_tx
                        .send(TailEvent::NoData { element, stream })
                        .await;
                    return;
                }
                Ok(Some(entry)) => {
                    if cursor.accept(entry.timestamp) {
                        // A closed channel means the consumer went away
                        if event_tx.send(TailEvent::Entry(entry)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = event_tx.send(TailEvent::Failed(e)).await;
                    return;
                }
            }

            let delay = pacing_delay(rate, poll_start.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => return,
            }
        }
    });

    TailHandle { events, stop }
}

/// Loop-carried dedup state: the timestamp of the last emitted entry
///
/// Dedup is by timestamp equality only; payload equality is irrelevant.
/// Emitted timestamps are strictly increasing.
struct TailCursor {
    last: Option<u64>,
}

impl TailCursor {
    fn new() -> Self {
        Self { last: None }
    }

    /// Whether an observation with this timestamp should be emitted
    fn accept(&mut self, timestamp: u64) -> bool {
        match self.last {
            Some(last) if timestamp <= last => false,
            _ => {
                self.last = Some(timestamp);
                true
            }
        }
    }
}

/// Time to wait before the next poll: `max(0, 1/rate - elapsed)`
///
/// Measured from poll start, so the bound holds between poll attempts, not
/// emissions. No rate means no pacing.
fn pacing_delay(rate: Option<f64>, elapsed: Duration) -> Duration {
    match rate {
        Some(rate) if rate > 0.0 => {
            Duration::from_secs_f64(1.0 / rate).saturating_sub(elapsed)
        }
        _ => Duration::ZERO,
    }
}

/// Run the read command: print entries until Ctrl-C or a terminal event
pub async fn run(ctx: &super::Ctx, target: &str, rate: Option<f64>) -> Result<()> {
    let (element, stream) = split_target(target)?;
    if let Some(rate) = rate {
        if !(rate > 0.0) {
            bail!("rate must be a positive number");
        }
    }
    let rate = rate.or(ctx.default_rate);

    let mut handle = spawn_tail(
        ctx.client.clone(),
        element.to_string(),
        stream.to_string(),
        rate,
    );

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(TailEvent::Entry(entry)) => println!("{}", output::format_entry(&entry)),
                Some(TailEvent::NoData { element, stream }) => {
                    println!("No data from {element}:{stream}.");
                    return Ok(());
                }
                Some(TailEvent::Failed(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                return Ok(());
            }
        }
    }
}

/// Split an `element:stream` target
fn split_target(target: &str) -> Result<(&str, &str)> {
    match target.split_once(':') {
        Some((element, stream)) if !element.is_empty() && !stream.is_empty() => {
            Ok((element, stream))
        }
        _ => bail!("target must be element:stream"),
    }
}

#[cfg(test)]
#[path = "read_test.rs"]
mod tests;
