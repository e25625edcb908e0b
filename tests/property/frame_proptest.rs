//! Property-based tests for the STOMP frame codec

use proptest::prelude::*;
use shoot_client::client::transport::frame::{StompCommand, StompFrame};

/// Text that exercises every escaped character; NUL never appears in frames
fn frame_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!['a', 'Z', '0', ' ', '/', ':', '\\', '\n', '\r', '{', '"', 'é']),
        0..24,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn command() -> impl Strategy<Value = StompCommand> {
    prop::sample::select(vec![
        StompCommand::Send,
        StompCommand::Message,
        StompCommand::Subscribe,
        StompCommand::Error,
        StompCommand::Receipt,
    ])
}

fn frame() -> impl Strategy<Value = StompFrame> {
    (
        command(),
        prop::collection::vec((frame_text(), frame_text()), 0..4),
        frame_text(),
    )
        .prop_map(|(command, headers, body)| StompFrame { command, headers, body })
}

proptest! {
    #[test]
    fn test_headers_survive_escaping(frame in frame()) {
        let decoded = StompFrame::decode(&frame.encode()).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_all_skips_heartbeats(
        frames in prop::collection::vec(frame(), 1..5),
        beats in prop::collection::vec(prop::sample::select(vec!["", "\n", "\r\n", "\n\n"]), 5),
    ) {
        let mut payload = String::new();
        for (i, frame) in frames.iter().enumerate() {
            payload.push_str(beats[i]);
            payload.push_str(&frame.encode());
        }
        payload.push_str(beats[frames.len() % beats.len()]);

        let decoded = StompFrame::decode_all(&payload).unwrap();
        prop_assert_eq!(decoded, frames);
    }

    #[test]
    fn test_encoded_frame_has_single_terminator(frame in frame()) {
        let encoded = frame.encode();
        prop_assert!(encoded.ends_with('\0'));
        prop_assert_eq!(encoded.matches('\0').count(), 1);
    }
}
