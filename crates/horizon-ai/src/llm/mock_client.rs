//! Deterministic mock streaming client for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use super::{CompletionRequest, EventStream, StreamEvent, StreamFailure, StreamingClient};

/// Scripted response for one `complete_stream` call.
#[derive(Debug, Clone, Default)]
pub struct MockStream {
    pub events: Vec<StreamEvent>,
    /// Delay before each event is delivered
    pub delay_ms: u64,
}

impl MockStream {
    /// Fragments followed by `Done`.
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<StreamEvent> = fragments
            .into_iter()
            .map(|f| StreamEvent::Fragment(f.into()))
            .collect();
        events.push(StreamEvent::Done(None));
        Self {
            events,
            delay_ms: 0,
        }
    }

    /// Fragments followed by a failure.
    pub fn failing<I, S>(fragments: I, failure: StreamFailure) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events: Vec<StreamEvent> = fragments
            .into_iter()
            .map(|f| StreamEvent::Fragment(f.into()))
            .collect();
        events.push(StreamEvent::Failed(failure));
        Self {
            events,
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A streaming client that replays scripted event sequences in order and
/// records every request it receives.
#[derive(Debug, Clone, Default)]
pub struct MockStreamClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStream>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockStreamClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_streams(model: impl Into<String>, streams: Vec<MockStream>) -> Self {
        let client = Self::new(model);
        client.script.lock().extend(streams);
        client
    }

    pub fn push_stream(&self, stream: MockStream) {
        self.script.lock().push_back(stream);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

impl StreamingClient for MockStreamClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn complete_stream(&self, request: CompletionRequest, cancel: CancellationToken) -> EventStream {
        self.requests.lock().push(request);
        let script = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockStream::text(["mock-ok"]));

        Box::pin(async_stream::stream! {
            for event in script.events {
                if script.delay_ms > 0 {
                    let cancelled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => true,
                        _ = sleep(Duration::from_millis(script.delay_ms)) => false,
                    };
                    if cancelled {
                        yield StreamEvent::Failed(StreamFailure::Cancelled);
                        return;
                    }
                } else if cancel.is_cancelled() {
                    yield StreamEvent::Failed(StreamFailure::Cancelled);
                    return;
                }

                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    return;
                }
            }
        })
    }
}
