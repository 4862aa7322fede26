use ask_protocol::StreamEvent;
use session_api::sse::{SseStreamParser, DEFAULT_EVENT_NAME};

#[test]
fn sse_framing_reads_event_names_and_joins_data_lines() {
    let payload = concat!(
        "event: message.part.delta\n",
        "data: {\"messageId\":\"m1\",\n",
        "data: \"delta\":\"hel\"}\n\n",
        "data: {\"x\":1}\n\n",
    );

    let frames = SseStreamParser::parse_frames(payload);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].event, "message.part.delta");
    assert_eq!(frames[0].data, "{\"messageId\":\"m1\",\n\"delta\":\"hel\"}");
    assert_eq!(frames[1].event, DEFAULT_EVENT_NAME);
    assert!(matches!(
        frames[0].decode(),
        StreamEvent::AssistantDelta { .. }
    ));
}

#[test]
fn sse_parser_ignores_comments_and_dataless_frames() {
    let payload = concat!(
        ": keepalive\n\n",
        "event: tool.call\nid: 4\nretry: 100\n\n",
        "event: error\ndata: \n\n",
        "event: error\ndata: boom\n\n",
    );

    let frames = SseStreamParser::parse_frames(payload);
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0].decode(),
        StreamEvent::Error {
            message: "boom".to_string()
        }
    );
}

#[test]
fn sse_parser_normalizes_crlf_split_across_chunks() {
    let mut parser = SseStreamParser::default();
    assert!(parser.feed(b"event: tool.call\r\ndata: {}\r").is_empty());
    let frames = parser.feed(b"\n\r\n");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, "tool.call");
}

#[test]
fn sse_parser_keeps_incomplete_trailing_bytes() {
    let mut parser = SseStreamParser::default();
    assert!(parser
        .feed(b"event: reasoning.delta\ndata: {\"delta\":\"nope\"}")
        .is_empty());
    assert!(!parser.is_empty_buffer());
}

#[test]
fn feed_events_decodes_unknown_names_defensively() {
    let mut parser = SseStreamParser::default();
    let events = parser.feed_events(b"event: session.updated\ndata: {\"id\":1}\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), "unknown");
}
