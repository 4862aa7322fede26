use ask_protocol::{PlanStatus, StreamEvent, TokenUsage, ToolArtifact};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn assistant_delta_keeps_whitespace() {
    let event = StreamEvent::decode("message.part.delta", r#"{"messageId":"m1","delta":"  hi\n"}"#);
    assert_eq!(
        event,
        StreamEvent::AssistantDelta {
            message_id: Some("m1".to_string()),
            delta: "  hi\n".to_string(),
        }
    );
}

#[test]
fn tool_call_without_name_defaults_to_tool() {
    let event = StreamEvent::decode("tool.call", r#"{"callId":"c1","args":{"path":"src"}}"#);
    assert_eq!(
        event,
        StreamEvent::ToolCall {
            name: "tool".to_string(),
            call_id: Some("c1".to_string()),
            args: json!({"path": "src"}),
        }
    );
}

#[test]
fn tool_delta_stringifies_structured_deltas() {
    let event = StreamEvent::decode("tool.delta", r#"{"name":"bash","delta":{"line":1}}"#);
    assert_eq!(
        event,
        StreamEvent::ToolDelta {
            name: "bash".to_string(),
            call_id: None,
            channel: "output".to_string(),
            delta: r#"{"line":1}"#.to_string(),
        }
    );
}

#[test]
fn tool_result_reads_artifact_and_error() {
    let event = StreamEvent::decode(
        "tool.result",
        r#"{"name":"apply_patch","callId":"c9","result":{"ok":true},
            "artifact":{"kind":"file_diff","patch":"*** Update File: a.rs\n","summary":{"files":1}},
            "error":"  "}"#,
    );
    let StreamEvent::ToolResult {
        name,
        call_id,
        artifact,
        error,
        ..
    } = event
    else {
        panic!("expected tool result");
    };
    assert_eq!(name, "apply_patch");
    assert_eq!(call_id.as_deref(), Some("c9"));
    assert_eq!(error, None);
    assert_eq!(
        artifact,
        Some(ToolArtifact {
            kind: "file_diff".to_string(),
            patch: Some("*** Update File: a.rs\n".to_string()),
            summary: Some(json!({"files": 1})),
        })
    );
}

#[test]
fn plan_items_accept_strings_and_objects() {
    let event = StreamEvent::decode(
        "plan.updated",
        r#"{"items":["read code",{"step":"write","status":"in_progress"},{"status":"done"},3],"note":"n"}"#,
    );
    let StreamEvent::PlanUpdated { items, note } = event else {
        panic!("expected plan");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, PlanStatus::Pending);
    assert_eq!(items[1].step, "write");
    assert_eq!(items[1].status, PlanStatus::InProgress);
    assert_eq!(note.as_deref(), Some("n"));
}

#[test]
fn approval_without_call_id_is_unknown() {
    let event = StreamEvent::decode("tool.approval.required", r#"{"toolName":"bash"}"#);
    assert!(matches!(event, StreamEvent::Unknown { .. }));

    let event = StreamEvent::decode(
        "tool.approval.required",
        r#"{"callId":"c1","toolName":"bash","args":{"cmd":"ls"},"messageId":"m1"}"#,
    );
    let StreamEvent::ApprovalRequired(request) = event else {
        panic!("expected approval");
    };
    assert_eq!(request.tool_name, "bash");
    assert_eq!(request.message_id.as_deref(), Some("m1"));
}

#[test]
fn completion_derives_total_only_when_both_counts_present() {
    let event = StreamEvent::decode(
        "message.completed",
        r#"{"id":"m1","usage":{"inputTokens":"10","outputTokens":5},"costUsd":0.25,"finishReason":"stop"}"#,
    );
    assert_eq!(
        event,
        StreamEvent::Completed {
            message_id: Some("m1".to_string()),
            usage: Some(TokenUsage {
                input_tokens: Some(10),
                output_tokens: Some(5),
                total_tokens: Some(15),
                cost_usd: Some(0.25),
                finish_reason: Some("stop".to_string()),
            }),
        }
    );

    let partial = TokenUsage::from_completion(&json!({"usage": {"outputTokens": 0}}))
        .expect("zero is reported usage");
    assert_eq!(partial.output_tokens, Some(0));
    assert_eq!(partial.total_tokens, None);
    assert_eq!(partial.input_tokens, None);

    let supplied = TokenUsage::from_completion(
        &json!({"usage": {"inputTokens": 1, "outputTokens": 2, "totalTokens": 9}}),
    )
    .expect("usage");
    assert_eq!(supplied.total_tokens, Some(9));
}

#[test]
fn completion_without_usage_has_no_summary() {
    let event = StreamEvent::decode("message.completed", r#"{"id":"m2"}"#);
    assert_eq!(
        event,
        StreamEvent::Completed {
            message_id: Some("m2".to_string()),
            usage: None,
        }
    );
}

#[test]
fn error_events_accept_strings_and_structured_payloads() {
    assert_eq!(
        StreamEvent::decode("error", r#"{"error":"quota exceeded"}"#),
        StreamEvent::Error {
            message: "quota exceeded".to_string()
        }
    );
    assert_eq!(
        StreamEvent::decode("error", "plain text failure"),
        StreamEvent::Error {
            message: "plain text failure".to_string()
        }
    );
    assert_eq!(
        StreamEvent::decode(
            "error",
            r#"{"error":{"message":"bad"},"message":"stream","details":{"code":7}}"#
        ),
        StreamEvent::Error {
            message: r#"bad stream Details: {"code":7}"#.to_string()
        }
    );
}

#[test]
fn malformed_payloads_decode_to_unknown() {
    assert!(matches!(
        StreamEvent::decode("tool.call", "{broken"),
        StreamEvent::Unknown { .. }
    ));
    assert!(matches!(
        StreamEvent::decode("tool.call", "[1,2]"),
        StreamEvent::Unknown { .. }
    ));
    let event = StreamEvent::decode("session.updated", r#"{"x":1}"#);
    assert_eq!(event.kind(), "unknown");
}
