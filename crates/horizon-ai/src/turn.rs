//! Turn runner: drives one streaming completion into a finished message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use horizon_models::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, FinishReason, StreamEvent, StreamFailure, StreamingClient};
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::segment::{PayloadTracker, Segmentation, segment};

/// Receives the progress of a running turn.
///
/// Fragments arrive in order; afterwards exactly one of `on_complete` or
/// `on_error` is called.
#[async_trait]
pub trait TurnEmitter: Send {
    async fn on_fragment(&mut self, fragment: &str, segmentation: &Segmentation);
    /// Called once each time the extracted code changes to a new value.
    async fn on_code_payload(&mut self, code: &str);
    async fn on_complete(&mut self, message: &Message);
    async fn on_error(&mut self, reason: &str);
}

pub struct NullEmitter;

#[async_trait]
impl TurnEmitter for NullEmitter {
    async fn on_fragment(&mut self, _fragment: &str, _segmentation: &Segmentation) {}
    async fn on_code_payload(&mut self, _code: &str) {}
    async fn on_complete(&mut self, _message: &Message) {}
    async fn on_error(&mut self, _reason: &str) {}
}

/// Turn progress as an owned event, for channel-based consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Fragment {
        text: String,
        visible_text: String,
        reasoning_segments: Vec<String>,
        thinking: bool,
    },
    CodePayload(String),
    Complete(Message),
    Error(String),
}

pub struct ChannelEmitter {
    tx: mpsc::Sender<TurnEvent>,
}

impl ChannelEmitter {
    pub fn new(tx: mpsc::Sender<TurnEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TurnEmitter for ChannelEmitter {
    async fn on_fragment(&mut self, fragment: &str, segmentation: &Segmentation) {
        let _ = self
            .tx
            .send(TurnEvent::Fragment {
                text: fragment.to_string(),
                visible_text: segmentation.visible_text.clone(),
                reasoning_segments: segmentation.reasoning_segments.clone(),
                thinking: segmentation.is_thinking(),
            })
            .await;
    }

    async fn on_code_payload(&mut self, code: &str) {
        let _ = self.tx.send(TurnEvent::CodePayload(code.to_string())).await;
    }

    async fn on_complete(&mut self, message: &Message) {
        let _ = self.tx.send(TurnEvent::Complete(message.clone())).await;
    }

    async fn on_error(&mut self, reason: &str) {
        let _ = self.tx.send(TurnEvent::Error(reason.to_string())).await;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnStatus {
    Completed(Option<FinishReason>),
    Failed(StreamFailure),
}

/// Frozen result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Assistant message to append to the conversation. On failure this is
    /// the synthetic error message.
    pub message: Message,
    /// Everything the stream delivered, even when it failed midway
    pub text: String,
    pub reasoning_segments: Vec<String>,
    /// Last code payload reported during the turn
    pub code_payload: Option<String>,
    pub status: TurnStatus,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, TurnStatus::Completed(_))
    }

    pub fn failure(&self) -> Option<&StreamFailure> {
        match &self.status {
            TurnStatus::Failed(failure) => Some(failure),
            TurnStatus::Completed(_) => None,
        }
    }
}

pub fn error_message(reason: &str) -> String {
    format!("Sorry, I encountered an error: {reason}. Please try again.")
}

/// Runs conversation turns against a streaming client, one at a time.
pub struct TurnRunner {
    client: Arc<dyn StreamingClient>,
    system_prompt: String,
    in_flight: Arc<AtomicBool>,
}

impl TurnRunner {
    pub fn new(client: Arc<dyn StreamingClient>) -> Self {
        Self {
            client,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// `history` must already end with the user's new message.
    pub fn build_request(&self, history: &[Message]) -> CompletionRequest {
        CompletionRequest::from_history(&self.system_prompt, history)
    }

    /// Stream one assistant turn.
    ///
    /// Returns `AiError::TurnInProgress` without touching the network when
    /// another turn is still streaming. Transport failures are not errors
    /// here: they end the turn with `TurnStatus::Failed`.
    pub async fn run(
        &self,
        history: &[Message],
        emitter: &mut dyn TurnEmitter,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AiError::TurnInProgress)?;

        let started = Instant::now();
        let request = self.build_request(history);
        let mut stream = self.client.complete_stream(request, cancel);

        let mut text = String::new();
        let mut tracker = PayloadTracker::new();
        let mut segmentation = Segmentation::default();
        let mut fragments = 0usize;

        let status = loop {
            let Some(event) = stream.next().await else {
                // Stream ended without a terminal event; treat as a graceful close.
                break TurnStatus::Completed(None);
            };

            match event {
                StreamEvent::Fragment(fragment) => {
                    fragments += 1;
                    text.push_str(&fragment);
                    segmentation = segment(&text);
                    emitter.on_fragment(&fragment, &segmentation).await;
                    if let Some(code) = tracker.observe(&segmentation) {
                        tracing::debug!(bytes = code.len(), "Code payload updated");
                        emitter.on_code_payload(&code).await;
                    }
                }
                StreamEvent::Done(reason) => break TurnStatus::Completed(reason),
                StreamEvent::Failed(failure) => break TurnStatus::Failed(failure),
            }
        };
        drop(stream);

        let message = match &status {
            TurnStatus::Completed(reason) => {
                tracing::info!(
                    provider = self.client.provider(),
                    model = self.client.model(),
                    fragments,
                    chars = text.len(),
                    finish_reason = ?reason,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Turn completed"
                );
                let message = Message::assistant(text.clone());
                emitter.on_complete(&message).await;
                message
            }
            TurnStatus::Failed(failure) => {
                let reason = failure.to_string();
                tracing::warn!(
                    provider = self.client.provider(),
                    fragments,
                    error = %reason,
                    "Turn failed"
                );
                emitter.on_error(&reason).await;
                Message::assistant(error_message(&reason))
            }
        };

        Ok(TurnOutcome {
            message,
            text,
            reasoning_segments: segmentation.reasoning_segments,
            code_payload: tracker.into_current(),
            status,
        })
    }
}

/// Holds the single in-flight slot until dropped.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockStream, MockStreamClient, Role};

    #[derive(Default)]
    struct RecordingEmitter {
        fragments: Vec<String>,
        visible: Vec<String>,
        payloads: Vec<String>,
        completed: Vec<Message>,
        errors: Vec<String>,
    }

    #[async_trait]
    impl TurnEmitter for RecordingEmitter {
        async fn on_fragment(&mut self, fragment: &str, segmentation: &Segmentation) {
            self.fragments.push(fragment.to_string());
            self.visible.push(segmentation.visible_text.clone());
        }

        async fn on_code_payload(&mut self, code: &str) {
            self.payloads.push(code.to_string());
        }

        async fn on_complete(&mut self, message: &Message) {
            self.completed.push(message.clone());
        }

        async fn on_error(&mut self, reason: &str) {
            self.errors.push(reason.to_string());
        }
    }

    fn runner(streams: Vec<MockStream>) -> (TurnRunner, MockStreamClient) {
        let client = MockStreamClient::from_streams("mock-model", streams);
        (TurnRunner::new(Arc::new(client.clone())), client)
    }

    #[tokio::test]
    async fn test_fragments_accumulate_into_message() {
        let (runner, _) = runner(vec![MockStream::text(["Hello", " wor", "ld"])]);
        let mut emitter = RecordingEmitter::default();

        let outcome = runner
            .run(&[Message::user("hi")], &mut emitter, CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.text, "Hello world");
        assert_eq!(outcome.message.content, "Hello world");
        assert_eq!(emitter.fragments, vec!["Hello", " wor", "ld"]);
        assert_eq!(emitter.completed.len(), 1);
        assert!(emitter.errors.is_empty());
        assert!(!runner.is_streaming());
    }

    #[tokio::test]
    async fn test_request_has_system_prompt_then_history() {
        let (runner, client) = runner(vec![MockStream::text(["ok"])]);
        let runner = runner.with_system_prompt("html only");
        let history = vec![
            Message::user("page"),
            Message::assistant("```html\n<p>1</p>\n```"),
            Message::user("bigger"),
        ];

        runner
            .run(&history, &mut NullEmitter, CancellationToken::new())
            .await
            .unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        let roles: Vec<Role> = requests[0].messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(requests[0].messages[0].content, "html only");
        assert_eq!(requests[0].messages[3].content, "bigger");
    }

    #[tokio::test]
    async fn test_code_payload_reported_mid_stream() {
        let (runner, _) = runner(vec![MockStream::text([
            "<think>hero + footer</think>",
            "Here it is:\n```html\n<!DOCTYPE html>\n",
            "<h1>Hi</h1>",
            "\n```\nDone.",
        ])]);
        let mut emitter = RecordingEmitter::default();

        let outcome = runner
            .run(&[Message::user("page")], &mut emitter, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            emitter.payloads,
            vec![
                "<!DOCTYPE html>".to_string(),
                "<!DOCTYPE html>\n<h1>Hi</h1>".to_string(),
            ]
        );
        assert_eq!(outcome.code_payload.as_deref(), Some("<!DOCTYPE html>\n<h1>Hi</h1>"));
        assert_eq!(outcome.reasoning_segments, vec!["hero + footer"]);
        assert!(!emitter.visible[0].contains("hero"));
    }

    #[tokio::test]
    async fn test_fenced_document_wins_over_doctype_in_prose() {
        let (runner, _) = runner(vec![MockStream::text([
            "The page starts with <!DOCTYPE html> as usual.\n",
            "```html\n<!DOCTYPE html>\n<p>real</p>\n```\nEnjoy!",
        ])]);
        let mut emitter = RecordingEmitter::default();

        let outcome = runner
            .run(&[Message::user("page")], &mut emitter, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.code_payload.as_deref(), segment(&outcome.text).code());
        assert_eq!(outcome.code_payload.as_deref(), Some("<!DOCTYPE html>\n<p>real</p>"));
        assert_eq!(
            emitter.payloads.last().map(String::as_str),
            Some("<!DOCTYPE html>\n<p>real</p>")
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_text() {
        let failure = StreamFailure::Status {
            status: 500,
            body: "internal".to_string(),
        };
        let (runner, _) = runner(vec![MockStream::failing(["partial ", "text"], failure.clone())]);
        let mut emitter = RecordingEmitter::default();

        let outcome = runner
            .run(&[Message::user("page")], &mut emitter, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.failure(), Some(&failure));
        assert_eq!(outcome.text, "partial text");
        assert_eq!(emitter.fragments, vec!["partial ", "text"]);
        assert_eq!(emitter.errors, vec!["HTTP error! status: 500"]);
        assert!(emitter.completed.is_empty());
        assert_eq!(
            outcome.message.content,
            "Sorry, I encountered an error: HTTP error! status: 500. Please try again."
        );
        assert!(!runner.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_turn_rejected_while_streaming() {
        let (runner, _) = runner(vec![MockStream::text(["a", "b", "c"]).with_delay(50)]);
        let history = [Message::user("page")];

        let first = async {
            runner
                .run(&history, &mut NullEmitter, CancellationToken::new())
                .await
        };
        let second = async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            runner
                .run(&history, &mut NullEmitter, CancellationToken::new())
                .await
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.unwrap().is_completed());
        assert!(matches!(second, Err(AiError::TurnInProgress)));

        // Slot is free again once the first turn is done.
        let third = runner
            .run(&history, &mut NullEmitter, CancellationToken::new())
            .await;
        assert!(third.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_turn() {
        let (runner, _) = runner(vec![MockStream::text(["a", "b", "c"]).with_delay(50)]);
        let history = [Message::user("page")];
        let cancel = CancellationToken::new();
        let mut emitter = RecordingEmitter::default();

        let trigger = cancel.clone();
        let (outcome, _) = tokio::join!(
            runner.run(&history, &mut emitter, cancel),
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(75)).await;
                trigger.cancel();
            }
        );

        let outcome = outcome.unwrap();
        assert_eq!(outcome.failure(), Some(&StreamFailure::Cancelled));
        assert_eq!(outcome.text, "a");
        assert_eq!(emitter.errors, vec!["Request cancelled"]);
    }

    #[tokio::test]
    async fn test_channel_emitter_forwards_events() {
        let (runner, _) = runner(vec![MockStream::text(["```html\n<p>x</p>\n```"])]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut emitter = ChannelEmitter::new(tx);

        runner
            .run(&[Message::user("page")], &mut emitter, CancellationToken::new())
            .await
            .unwrap();
        drop(emitter);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TurnEvent::Fragment { .. }));
        assert_eq!(events[1], TurnEvent::CodePayload("<p>x</p>".to_string()));
        assert!(matches!(events[2], TurnEvent::Complete(_)));
    }
}
