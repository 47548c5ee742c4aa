//! Tests for the list command

use rill_bus::{BusError, CommandResponse};

use super::*;
use crate::testutil::{fields, start_bus};

#[tokio::test]
async fn test_list_elements_and_streams_run() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.register_element("robot");
    bus.append("camera", "frames", fields(&[("data", "f0")]));

    assert!(run(&ctx, ListMode::Elements).await.is_ok());
    assert!(run(&ctx, ListMode::Streams { element: None }).await.is_ok());
    assert!(run(
        &ctx,
        ListMode::Streams {
            element: Some("camera".to_string())
        }
    )
    .await
    .is_ok());
}

#[tokio::test]
async fn test_list_commands_uses_the_exchange() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.add_command("robot", "wave", |_| CommandResponse::ok(Vec::new()));
    bus.add_command("robot", "walk", |_| CommandResponse::ok(Vec::new()));

    let result = run(
        &ctx,
        ListMode::Commands {
            element: "robot".to_string(),
        },
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_list_commands_unknown_element_is_an_error() {
    let (_bus, ctx, _dir) = start_bus().await;

    let err = run(
        &ctx,
        ListMode::Commands {
            element: "ghost".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BusError>(),
        Some(BusError::UnknownElement { .. })
    ));
}

#[tokio::test]
async fn test_list_commands_malformed_payload_is_an_error() {
    let (bus, ctx, _dir) = start_bus().await;

    // An element that answers the reserved command with garbage
    bus.add_command("odd", rill_bus::COMMAND_LIST, |_| {
        CommandResponse::ok(b"not json".to_vec())
    });

    let result = run(
        &ctx,
        ListMode::Commands {
            element: "odd".to_string(),
        },
    )
    .await;
    assert!(result.is_err());
}
