use ask_protocol::StreamEvent;

/// Event name used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One complete server-sent-events frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

impl SseFrame {
    pub fn decode(&self) -> StreamEvent {
        StreamEvent::decode(&self.event, &self.data)
    }
}

/// Incremental parser for SSE text streams.
///
/// Frames end at a blank line. Multiple `data:` lines are joined with `\n`.
/// Comment lines (`:keepalive`), `id:`, and `retry:` are ignored, as are
/// frames without data.
#[derive(Debug, Default)]
pub struct SseStreamParser {
    buffer: String,
}

impl SseStreamParser {
    /// Feed arbitrary bytes into the parser and drain complete frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut frames = Vec::new();
        while let Some(split) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..split + 2).collect();
            if let Some(frame) = parse_frame(&frame[..split]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Feed bytes and decode the completed frames into stream events.
    pub fn feed_events(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.feed(bytes).iter().map(SseFrame::decode).collect()
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<SseFrame> {
        let mut parser = Self::default();
        parser.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }
}

fn parse_frame(frame: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.trim().to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    let data = data_lines.join("\n");
    if data.trim().is_empty() {
        return None;
    }

    Some(SseFrame {
        event: event
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
        data,
    })
}
