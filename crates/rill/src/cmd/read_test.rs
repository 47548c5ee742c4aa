//! Tests for the stream tail loop

use std::time::Duration;

use super::*;
use crate::testutil::{fields, start_bus};

/// Receive the next tail event or panic after a generous deadline
async fn next_event(handle: &mut TailHandle) -> TailEvent {
    tokio::time::timeout(Duration::from_secs(2), handle.events.recv())
        .await
        .expect("timed out waiting for tail event")
        .expect("tail channel closed unexpectedly")
}

// ============================================================================
// Dedup cursor
// ============================================================================

#[test]
fn test_cursor_accepts_first_observation() {
    let mut cursor = TailCursor::new();
    assert!(cursor.accept(100));
}

#[test]
fn test_cursor_suppresses_repeats() {
    let mut cursor = TailCursor::new();
    assert!(cursor.accept(100));

    // Same newest entry observed across many polls emits exactly once
    for _ in 0..10 {
        assert!(!cursor.accept(100));
    }
    assert!(cursor.accept(200));
}

#[test]
fn test_cursor_emits_strictly_increasing() {
    let mut cursor = TailCursor::new();
    assert!(cursor.accept(200));
    assert!(!cursor.accept(100));
    assert!(!cursor.accept(200));
    assert!(cursor.accept(201));
}

// ============================================================================
// Pacing
// ============================================================================

#[test]
fn test_pacing_no_rate_means_no_delay() {
    assert_eq!(pacing_delay(None, Duration::ZERO), Duration::ZERO);
}

#[test]
fn test_pacing_subtracts_elapsed() {
    let delay = pacing_delay(Some(10.0), Duration::from_millis(20));
    assert_eq!(delay, Duration::from_millis(80));
}

#[test]
fn test_pacing_never_negative() {
    let delay = pacing_delay(Some(10.0), Duration::from_millis(150));
    assert_eq!(delay, Duration::ZERO);
}

#[test]
fn test_pacing_full_period_when_instant() {
    let delay = pacing_delay(Some(4.0), Duration::ZERO);
    assert_eq!(delay, Duration::from_millis(250));
}

// ============================================================================
// Target parsing
// ============================================================================

#[test]
fn test_split_target() {
    assert_eq!(split_target("camera:frames").unwrap(), ("camera", "frames"));
}

#[test]
fn test_split_target_rejects_malformed() {
    assert!(split_target("no-colon").is_err());
    assert!(split_target(":stream").is_err());
    assert!(split_target("element:").is_err());
}

// ============================================================================
// End to end against the bus
// ============================================================================

#[tokio::test]
async fn test_tail_starts_at_newest_entry() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.append_at("elem", "s1", 100, fields(&[("x", "1")]));
    bus.append_at("elem", "s1", 200, fields(&[("x", "2")]));

    let mut handle = spawn_tail(
        ctx.client.clone(),
        "elem".to_string(),
        "s1".to_string(),
        None,
    );

    // The first emission is the newest entry; t=100 is never seen
    match next_event(&mut handle).await {
        TailEvent::Entry(entry) => {
            assert_eq!(entry.timestamp, 200);
            assert_eq!(entry.text("x"), Some("2"));
        }
        other => panic!("expected Entry, got {other:?}"),
    }

    handle.stop();
}

#[tokio::test]
async fn test_tail_emits_each_change_once() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.append_at("elem", "s1", 100, fields(&[("x", "1")]));

    let mut handle = spawn_tail(
        ctx.client.clone(),
        "elem".to_string(),
        "s1".to_string(),
        None,
    );

    match next_event(&mut handle).await {
        TailEvent::Entry(entry) => assert_eq!(entry.timestamp, 100),
        other => panic!("expected Entry, got {other:?}"),
    }

    // Unchanged newest entry is suppressed; the next emission is the append
    bus.append_at("elem", "s1", 300, fields(&[("x", "3")]));
    match next_event(&mut handle).await {
        TailEvent::Entry(entry) => {
            assert_eq!(entry.timestamp, 300);
            assert_eq!(entry.text("x"), Some("3"));
        }
        other => panic!("expected Entry, got {other:?}"),
    }

    handle.stop();
}

#[tokio::test]
async fn test_tail_missing_stream_signals_no_data() {
    let (_bus, ctx, _dir) = start_bus().await;

    let mut handle = spawn_tail(
        ctx.client.clone(),
        "elem".to_string(),
        "missing_stream".to_string(),
        None,
    );

    match next_event(&mut handle).await {
        TailEvent::NoData { element, stream } => {
            assert_eq!(element, "elem");
            assert_eq!(stream, "missing_stream");
        }
        other => panic!("expected NoData, got {other:?}"),
    }

    // Terminal: the channel closes after the signal
    assert!(handle.events.recv().await.is_none());
}

#[tokio::test]
async fn test_tail_stop_ends_the_sequence() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.append_at("elem", "s1", 100, fields(&[("x", "1")]));

    let mut handle = spawn_tail(
        ctx.client.clone(),
        "elem".to_string(),
        "s1".to_string(),
        Some(50.0),
    );

    match next_event(&mut handle).await {
        TailEvent::Entry(_) => {}
        other => panic!("expected Entry, got {other:?}"),
    }

    handle.stop();

    // No more emissions; the task winds down and the channel closes
    let closed = tokio::time::timeout(Duration::from_secs(2), handle.events.recv())
        .await
        .expect("tail task did not stop");
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_tail_paced_loop_still_observes_changes() {
    let (bus, ctx, _dir) = start_bus().await;

    bus.append_at("elem", "s1", 100, fields(&[("x", "1")]));

    let mut handle = spawn_tail(
        ctx.client.clone(),
        "elem".to_string(),
        "s1".to_string(),
        Some(100.0),
    );

    match next_event(&mut handle).await {
        TailEvent::Entry(entry) => assert_eq!(entry.timestamp, 100),
        other => panic!("expected Entry, got {other:?}"),
    }

    bus.append_at("elem", "s1", 200, fields(&[("x", "2")]));
    match next_event(&mut handle).await {
        TailEvent::Entry(entry) => assert_eq!(entry.timestamp, 200),
        other => panic!("expected Entry, got {other:?}"),
    }

    handle.stop();
}
