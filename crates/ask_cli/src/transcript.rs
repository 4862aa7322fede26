//! Transcript assembly for the `--json` output mode.
//!
//! A transcript is a pure function of [`RunState`]: building it twice from
//! the same state yields byte-identical JSON.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use ask_protocol::{
    AssistantChunk, Timestamp, TokenUsage, ToolArtifact, ToolCallRecord, ToolResultRecord,
};

use crate::correlator::RunState;

/// A span of assistant text with the timestamps of its first and last chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpan {
    pub index: usize,
    pub ts_start: Timestamp,
    pub ts_end: Timestamp,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SequenceEntry {
    #[serde(rename = "user")]
    User { ts: Timestamp, text: String },
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(rename = "tsStart")]
        ts_start: Timestamp,
        #[serde(rename = "tsEnd")]
        ts_end: Timestamp,
        index: usize,
        text: String,
    },
    #[serde(rename = "tool.call")]
    ToolCall {
        ts: Timestamp,
        name: String,
        #[serde(rename = "callId", skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        args: Value,
    },
    #[serde(rename = "tool.result")]
    ToolResult {
        ts: Timestamp,
        name: String,
        #[serde(rename = "callId", skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(rename = "durationMs", skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        result: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<ToolArtifact>,
        #[serde(rename = "isError")]
        is_error: bool,
    },
    #[serde(rename = "error")]
    Error { ts: Timestamp, error: String },
}

impl SequenceEntry {
    fn sort_key(&self) -> Timestamp {
        match self {
            Self::User { ts, .. }
            | Self::ToolCall { ts, .. }
            | Self::ToolResult { ts, .. }
            | Self::Error { ts, .. } => *ts,
            Self::Assistant { ts_start, .. } => *ts_start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTiming {
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffArtifact {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub tool_counts: BTreeMap<String, usize>,
    pub tool_timings: Vec<ToolTiming>,
    pub total_tool_time_ms: u64,
    pub files_touched: Vec<String>,
    pub diff_artifacts: Vec<DiffArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRecords {
    pub calls: Vec<ToolCallRecord>,
    pub results: Vec<ToolResultRecord>,
}

/// Raw material added by `--json-verbose`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerboseSections {
    pub output: String,
    pub assistant_chunks: Vec<AssistantChunk>,
    pub assistant_lines: Vec<TextSpan>,
    pub assistant_segments: Vec<TextSpan>,
    pub tools: ToolRecords,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub session_id: String,
    pub assistant_message_id: String,
    pub agent: String,
    pub provider: String,
    pub model: String,
    pub sequence: Vec<SequenceEntry>,
    pub files_touched: Vec<String>,
    pub summary: TranscriptSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub verbose: Option<VerboseSections>,
}

impl Transcript {
    pub fn build(state: &RunState, verbose: bool) -> Self {
        let segments = assistant_segments(&state.chunks, &state.tool_calls);
        let sequence = build_sequence(state, &segments);
        let handshake = &state.handshake;
        Self {
            session_id: handshake.session_id.clone(),
            assistant_message_id: handshake.assistant_message_id.clone(),
            agent: handshake.agent.clone(),
            provider: handshake.provider.clone(),
            model: handshake.model.clone(),
            sequence,
            files_touched: state.files_touched.clone(),
            summary: summarize(state),
            finish_reason: state.finish_reason().map(ToString::to_string),
            verbose: verbose.then(|| VerboseSections {
                output: state.output.clone(),
                assistant_chunks: state.chunks.clone(),
                assistant_lines: assistant_lines(&state.chunks),
                assistant_segments: segments,
                tools: ToolRecords {
                    calls: state.tool_calls.clone(),
                    results: state.tool_results.clone(),
                },
            }),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Splits streamed text at newlines. Blank lines are dropped; each line spans
/// from the chunk that started it to the chunk that ended it.
pub fn assistant_lines(chunks: &[AssistantChunk]) -> Vec<TextSpan> {
    let mut lines = Vec::new();
    let Some(first) = chunks.first() else {
        return lines;
    };
    let mut buffer = String::new();
    let mut start = first.ts;
    for chunk in chunks {
        let mut parts = chunk.delta.split('\n');
        if let Some(head) = parts.next() {
            buffer.push_str(head);
        }
        for part in parts {
            push_span(&mut lines, &buffer, start, chunk.ts);
            buffer.clear();
            buffer.push_str(part);
            start = chunk.ts;
        }
    }
    let end = chunks.last().map_or(start, |chunk| chunk.ts);
    push_span(&mut lines, &buffer, start, end);
    lines
}

/// Splits streamed text into segments at tool-call boundaries: a chunk that
/// arrives at or after a call's timestamp starts a new segment.
pub fn assistant_segments(chunks: &[AssistantChunk], calls: &[ToolCallRecord]) -> Vec<TextSpan> {
    let mut segments = Vec::new();
    let Some(first) = chunks.first() else {
        return segments;
    };
    let mut call_times: Vec<Timestamp> = calls.iter().map(|call| call.ts).collect();
    call_times.sort_unstable();

    let mut buffer = String::new();
    let mut start = first.ts;
    let mut next_call = 0;
    for chunk in chunks {
        while next_call < call_times.len() && chunk.ts >= call_times[next_call] {
            push_span(&mut segments, &buffer, start, chunk.ts);
            buffer.clear();
            start = chunk.ts;
            next_call += 1;
        }
        buffer.push_str(&chunk.delta);
    }
    let end = chunks.last().map_or(start, |chunk| chunk.ts);
    push_span(&mut segments, &buffer, start, end);
    segments
}

fn push_span(spans: &mut Vec<TextSpan>, text: &str, ts_start: Timestamp, ts_end: Timestamp) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    spans.push(TextSpan {
        index: spans.len(),
        ts_start,
        ts_end,
        text: text.to_string(),
    });
}

/// Merges the prompt, assistant segments, calls, results, and stream errors
/// into one timeline. The sort is stable, so entries with equal timestamps keep
/// their insertion order.
pub fn build_sequence(state: &RunState, segments: &[TextSpan]) -> Vec<SequenceEntry> {
    let user_ts = segments
        .first()
        .map(|segment| segment.ts_start)
        .or_else(|| state.tool_calls.first().map(|call| call.ts))
        .unwrap_or(state.started_at);

    let mut sequence = vec![SequenceEntry::User {
        ts: user_ts,
        text: state.prompt.clone(),
    }];
    sequence.extend(segments.iter().map(|segment| SequenceEntry::Assistant {
        ts_start: segment.ts_start,
        ts_end: segment.ts_end,
        index: segment.index,
        text: segment.text.clone(),
    }));
    sequence.extend(state.tool_calls.iter().map(|call| SequenceEntry::ToolCall {
        ts: call.ts,
        name: call.name.clone(),
        call_id: call.call_id.clone(),
        args: call.args.clone(),
    }));
    sequence.extend(state.tool_results.iter().map(|result| SequenceEntry::ToolResult {
        ts: result.ts,
        name: result.name.clone(),
        call_id: result.call_id.clone(),
        duration_ms: result.duration_ms,
        result: result.result.clone(),
        artifact: result.artifact.clone(),
        is_error: result.is_error,
    }));
    sequence.extend(state.errors.iter().map(|record| SequenceEntry::Error {
        ts: record.ts,
        error: record.error.clone(),
    }));
    sequence.sort_by_key(SequenceEntry::sort_key);
    sequence
}

pub fn summarize(state: &RunState) -> TranscriptSummary {
    let mut tool_counts = BTreeMap::new();
    for call in &state.tool_calls {
        *tool_counts.entry(call.name.clone()).or_insert(0) += 1;
    }
    let tool_timings: Vec<ToolTiming> = state
        .tool_results
        .iter()
        .filter(|result| !result.duplicate)
        .filter_map(|result| {
            result.duration_ms.map(|duration_ms| ToolTiming {
                name: result.name.clone(),
                duration_ms,
            })
        })
        .collect();
    let total_tool_time_ms = tool_timings.iter().map(|timing| timing.duration_ms).sum();
    let diff_artifacts = state
        .tool_results
        .iter()
        .filter_map(|result| {
            let artifact = result.artifact.as_ref().filter(|a| a.is_file_diff())?;
            Some(DiffArtifact {
                name: result.name.clone(),
                summary: artifact.summary.clone(),
            })
        })
        .collect();

    TranscriptSummary {
        tool_counts,
        tool_timings,
        total_tool_time_ms,
        files_touched: state.files_touched.clone(),
        diff_artifacts,
        token_usage: state.usage.clone(),
    }
}
