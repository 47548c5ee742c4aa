//! Tests for the command exchange front

use std::time::Duration;

use rill_bus::{BusError, CommandResponse};

use super::*;
use crate::testutil::{start_bus, start_bus_with_timeout};

#[tokio::test]
async fn test_successful_exchange() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.add_command("robot", "echo", |payload| {
        CommandResponse::ok(payload.to_vec())
    });

    let result = run(&ctx, "robot", "echo", Some("hi")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_application_failure_is_not_an_error() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.add_command("robot", "wave", |_| CommandResponse::err(9, "arm jammed"));

    // A failed command result still prints as an envelope; the exchange
    // itself succeeded
    let result = run(&ctx, "robot", "wave", None).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_unknown_element_is_an_error() {
    let (_bus, ctx, _dir) = start_bus().await;

    let err = run(&ctx, "ghost", "wave", None).await.unwrap_err();
    match err.downcast_ref::<BusError>() {
        Some(BusError::UnknownElement { element }) => assert_eq!(element, "ghost"),
        other => panic!("expected UnknownElement, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_an_error() {
    let (bus, ctx, _dir) = start_bus_with_timeout(Duration::from_millis(50)).await;

    bus.register_mute_element("slow");

    let err = run(&ctx, "slow", "wave", None).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BusError>(),
        Some(BusError::Timeout { .. })
    ));
}
