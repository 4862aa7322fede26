use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Response;
use tracing::debug;

use ask_protocol::{CancelSignal, ClientError, EventSource, StreamEvent};

use crate::cancel::await_or_cancel;
use crate::error::SessionApiError;
use crate::sse::SseStreamParser;

/// Live event stream of one session.
///
/// Events are yielded strictly in arrival order. Once the body ends, errors,
/// or [`EventStream::close`] is called, the stream stays finished.
pub struct EventStream {
    body: Option<BoxStream<'static, Result<Vec<u8>, reqwest::Error>>>,
    parser: SseStreamParser,
    pending: VecDeque<StreamEvent>,
}

impl EventStream {
    pub(crate) fn from_response(response: Response) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Self {
            body: Some(body),
            parser: SseStreamParser::default(),
            pending: VecDeque::new(),
        }
    }

    pub async fn next_event(
        &mut self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Option<StreamEvent>, SessionApiError> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };

            match await_or_cancel(body.next(), cancel).await? {
                Some(Ok(chunk)) => self.pending.extend(self.parser.feed_events(&chunk)),
                Some(Err(error)) => {
                    self.body = None;
                    return Err(SessionApiError::Request(error));
                }
                None => {
                    self.body = None;
                    if !self.parser.is_empty_buffer() {
                        debug!("event stream ended inside a frame; discarding partial frame");
                    }
                }
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.body.is_none() && self.pending.is_empty()
    }

    /// Drops the connection and any undelivered events.
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            debug!("event stream closed");
        }
        self.pending.clear();
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("open", &self.body.is_some())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSource for EventStream {
    async fn next_event(
        &mut self,
        cancel: Option<&CancelSignal>,
    ) -> Result<Option<StreamEvent>, ClientError> {
        EventStream::next_event(self, cancel)
            .await
            .map_err(SessionApiError::into_transport_error)
    }

    async fn close(&mut self) {
        EventStream::close(self);
    }
}
