//! Shared helpers for command tests: an in-process bus on a temp socket

use std::time::Duration;

use rill_bus::{BusClient, FieldValue, MemBus};
use tempfile::TempDir;

use crate::cmd::Ctx;

/// Start a MemBus and a connected context with a 1s command timeout
pub(crate) async fn start_bus() -> (MemBus, Ctx, TempDir) {
    start_bus_with_timeout(Duration::from_secs(1)).await
}

/// Start a MemBus and a connected context with the given command timeout
pub(crate) async fn start_bus_with_timeout(timeout: Duration) -> (MemBus, Ctx, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.sock");

    let bus = MemBus::new();
    bus.spawn(&path);

    // The listener binds asynchronously; retry until it accepts
    let client = loop {
        match BusClient::connect_with_timeout(&path, timeout).await {
            Ok(client) => break client,
            Err(_) => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    };

    let ctx = Ctx {
        client,
        default_rate: None,
    };
    (bus, ctx, dir)
}

/// Build text-valued fields from pairs
pub(crate) fn fields(pairs: &[(&str, &str)]) -> Vec<(String, FieldValue)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::Text(v.to_string())))
        .collect()
}
