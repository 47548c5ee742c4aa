//! Tests for the bus wire protocol

use super::*;
use crate::entry::{CommandResponse, Entry, FieldValue};
use bytes::BufMut;

fn roundtrip_request(req: Request) {
    let encoded = req.encode();

    // Skip length prefix (4 bytes)
    let payload = encoded.slice(4..);
    let decoded = Request::decode(payload).unwrap();

    assert_eq!(decoded, req);
}

fn roundtrip_reply(reply: Reply) {
    let encoded = reply.encode();

    let payload = encoded.slice(4..);
    let decoded = Reply::decode(payload).unwrap();

    assert_eq!(decoded, reply);
}

// ============================================================================
// Request roundtrip tests
// ============================================================================

#[test]
fn test_list_elements_roundtrip() {
    roundtrip_request(Request {
        id: 1,
        body: RequestBody::ListElements,
    });
}

#[test]
fn test_list_streams_roundtrip() {
    roundtrip_request(Request {
        id: 2,
        body: RequestBody::ListStreams { element: None },
    });
    roundtrip_request(Request {
        id: 3,
        body: RequestBody::ListStreams {
            element: Some("camera".into()),
        },
    });
}

#[test]
fn test_range_read_roundtrip() {
    roundtrip_request(Request {
        id: 4,
        body: RequestBody::RangeRead {
            stream: "log".into(),
            start: Start::Beginning,
        },
    });
    roundtrip_request(Request {
        id: 5,
        body: RequestBody::RangeRead {
            stream: "log".into(),
            start: Start::At(123_456),
        },
    });
}

#[test]
fn test_read_latest_roundtrip() {
    roundtrip_request(Request {
        id: 6,
        body: RequestBody::ReadLatest {
            element: "camera".into(),
            stream: "frames".into(),
        },
    });
}

#[test]
fn test_command_roundtrip() {
    roundtrip_request(Request {
        id: 7,
        body: RequestBody::Command {
            element: "robot".into(),
            command: "wave".into(),
            payload: vec![0x01, 0x02, 0xFF],
        },
    });
}

#[test]
fn test_server_time_roundtrip() {
    roundtrip_request(Request {
        id: 8,
        body: RequestBody::ServerTime,
    });
}

// ============================================================================
// Reply roundtrip tests
// ============================================================================

#[test]
fn test_elements_roundtrip() {
    roundtrip_reply(Reply {
        id: 1,
        body: ReplyBody::Elements(vec!["camera".into(), "robot".into()]),
    });
}

#[test]
fn test_streams_empty_roundtrip() {
    roundtrip_reply(Reply {
        id: 2,
        body: ReplyBody::Streams(vec![]),
    });
}

#[test]
fn test_entries_roundtrip() {
    let entries = vec![
        Entry::new(
            100,
            vec![
                ("x".to_string(), FieldValue::Text("1".into())),
                ("raw".to_string(), FieldValue::Binary(vec![0, 1, 2])),
            ],
        ),
        Entry::new(200, vec![]),
    ];
    roundtrip_reply(Reply {
        id: 3,
        body: ReplyBody::Entries(entries),
    });
}

#[test]
fn test_latest_roundtrip() {
    roundtrip_reply(Reply {
        id: 4,
        body: ReplyBody::Latest(None),
    });
    roundtrip_reply(Reply {
        id: 5,
        body: ReplyBody::Latest(Some(Entry::new(
            7,
            vec![("data".to_string(), FieldValue::Text("v".into()))],
        ))),
    });
}

#[test]
fn test_response_roundtrip() {
    roundtrip_reply(Reply {
        id: 6,
        body: ReplyBody::Response(CommandResponse {
            err_code: 0,
            err_str: String::new(),
            data: b"payload".to_vec(),
        }),
    });
    roundtrip_reply(Reply {
        id: 7,
        body: ReplyBody::Response(CommandResponse::err(-3, "unable to comply")),
    });
}

#[test]
fn test_time_roundtrip() {
    roundtrip_reply(Reply {
        id: 8,
        body: ReplyBody::Time(1_700_000_000_000),
    });
}

#[test]
fn test_error_roundtrip() {
    roundtrip_reply(Reply {
        id: 9,
        body: ReplyBody::Error {
            kind: ErrorKind::NoSuchElement,
            message: "ghost".into(),
        },
    });
    roundtrip_reply(Reply {
        id: 10,
        body: ReplyBody::Error {
            kind: ErrorKind::Store,
            message: "disk on fire".into(),
        },
    });
}

#[test]
fn test_unicode_strings() {
    roundtrip_request(Request {
        id: 11,
        body: RequestBody::Command {
            element: "日本語".into(),
            command: "wave 🎉".into(),
            payload: vec![],
        },
    });
}

// ============================================================================
// Length prefix
// ============================================================================

#[test]
fn test_encoded_frame_has_valid_length() {
    let frame = Request {
        id: 42,
        body: RequestBody::ListElements,
    }
    .encode();

    let len = read_length_prefix(&frame).unwrap();
    assert_eq!(len as usize, frame.len() - 4);
}

#[test]
fn test_length_prefix_reading() {
    assert_eq!(read_length_prefix(&[0, 0, 1, 0]), Some(256));
    assert_eq!(read_length_prefix(&[0, 0, 0]), None);
}

// ============================================================================
// Error cases
// ============================================================================

#[test]
fn test_decode_empty_request() {
    assert!(Request::decode(Bytes::new()).is_err());
}

#[test]
fn test_decode_unknown_request_type() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x7E);
    buf.put_u64(1);
    let result = Request::decode(buf.freeze());
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("unknown request type"));
}

#[test]
fn test_decode_unknown_reply_type() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x90);
    buf.put_u64(1);
    let result = Reply::decode(buf.freeze());
    assert!(result.is_err());
}

#[test]
fn test_decode_truncated_string() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x04); // ReadLatest
    buf.put_u64(1);
    buf.put_u32(10); // claims 10 bytes
    buf.put_slice(b"abc"); // provides 3

    assert!(Request::decode(buf.freeze()).is_err());
}

#[test]
fn test_decode_truncated_entry() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x83); // Entries
    buf.put_u64(1);
    buf.put_u32(1); // one entry
    buf.put_u64(100); // timestamp
    // field count missing

    assert!(Reply::decode(buf.freeze()).is_err());
}

#[test]
fn test_decode_invalid_field_tag() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x84); // Latest
    buf.put_u64(1);
    buf.put_u8(1); // present
    buf.put_u64(100); // timestamp
    buf.put_u32(1); // one field
    buf.put_u32(1);
    buf.put_slice(b"x");
    buf.put_u8(9); // invalid tag

    let result = Reply::decode(buf.freeze());
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("invalid field tag"));
}

#[test]
fn test_decode_invalid_start_boundary() {
    let mut buf = BytesMut::new();
    buf.put_u8(0x03); // RangeRead
    buf.put_u64(1);
    buf.put_u32(3);
    buf.put_slice(b"log");
    buf.put_u8(7); // invalid boundary tag

    assert!(Request::decode(buf.freeze()).is_err());
}
