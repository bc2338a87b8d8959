//! OpenAI-compatible streaming chat completions client

use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::http_client::build_http_client;
use crate::llm::client::{
    ChatMessage, CompletionRequest, EventStream, FinishReason, StreamEvent, StreamFailure,
    StreamingClient,
};
use crate::llm::config::ProviderConfig;
use crate::llm::sse::{LineBuffer, SseLine, classify};
use crate::text_utils::Utf8Decoder;

/// Truncate error bodies to avoid logging large or sensitive responses.
const MAX_ERROR_BODY: usize = 512;

/// Streaming client for any `/chat/completions` endpoint speaking the
/// OpenAI event-stream format.
pub struct OpenAIClient {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: build_http_client()?,
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn request_body(&self, request: CompletionRequest) -> OpenAIStreamRequest {
        OpenAIStreamRequest {
            model: self.config.model.clone(),
            messages: request.messages,
            stream: true,
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request
                .max_tokens
                .unwrap_or(self.config.max_tokens)
                .min(self.config.max_tokens),
        }
    }
}

#[derive(Serialize, Debug)]
struct OpenAIStreamRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

// Streaming types

#[derive(Deserialize, Debug)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: Option<OpenAIStreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamDelta {
    content: Option<String>,
}

/// Events carried by one `data:` payload. Only `choices[0]` is consulted.
/// A payload that fails to parse is logged and yields nothing.
fn events_for_data(data: &str) -> Vec<StreamEvent> {
    let parsed: OpenAIStreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, payload = %data, "Failed to parse stream chunk");
            return Vec::new();
        }
    };

    let Some(choice) = parsed.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut events = Vec::with_capacity(2);
    if let Some(content) = choice.delta.and_then(|d| d.content)
        && !content.is_empty()
    {
        events.push(StreamEvent::Fragment(content));
    }
    if let Some(reason) = choice.finish_reason
        && !reason.is_empty()
    {
        events.push(StreamEvent::Done(Some(FinishReason::parse(&reason))));
    }
    events
}

fn events_for_line(line: &str) -> Vec<StreamEvent> {
    match classify(line) {
        SseLine::Ignore => Vec::new(),
        SseLine::Done => vec![StreamEvent::Done(None)],
        SseLine::Data(data) => events_for_data(data),
    }
}

async fn response_to_failure(response: Response) -> StreamFailure {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = if body.len() > MAX_ERROR_BODY {
        let cut = crate::text_utils::floor_char_boundary(&body, MAX_ERROR_BODY);
        format!("{}... [truncated]", &body[..cut])
    } else {
        body
    };

    StreamFailure::Status { status, body }
}

impl StreamingClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn complete_stream(&self, request: CompletionRequest, cancel: CancellationToken) -> EventStream {
        let client = self.client.clone();
        let api_url = self.config.api_url.clone();
        let api_key = self.config.api_key.clone();
        let body = self.request_body(request);

        Box::pin(async_stream::stream! {
            tracing::debug!(
                model = %body.model,
                messages = body.messages.len(),
                max_tokens = body.max_tokens,
                "Opening completion stream"
            );

            let send = client
                .post(&api_url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send();

            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = send => Some(result),
            };

            let response = match sent {
                None => {
                    yield StreamEvent::Failed(StreamFailure::Cancelled);
                    return;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Completion request failed");
                    yield StreamEvent::Failed(StreamFailure::Connection(e.to_string()));
                    return;
                }
                Some(Ok(resp)) => resp,
            };

            if !response.status().is_success() {
                let failure = response_to_failure(response).await;
                if let StreamFailure::Status { status, body } = &failure {
                    tracing::warn!(status, body = %body, "Completion endpoint returned an error");
                }
                yield StreamEvent::Failed(failure);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut decoder = Utf8Decoder::new();
            let mut lines = LineBuffer::new();
            let mut fragments = 0usize;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    chunk = byte_stream.next() => Some(chunk),
                };

                let chunk = match next {
                    None => {
                        tracing::debug!(fragments, "Completion stream cancelled");
                        yield StreamEvent::Failed(StreamFailure::Cancelled);
                        return;
                    }
                    Some(None) => break,
                    Some(Some(Err(e))) => {
                        tracing::warn!(error = %e, fragments, "Completion stream read failed");
                        yield StreamEvent::Failed(StreamFailure::Read(e.to_string()));
                        return;
                    }
                    Some(Some(Ok(bytes))) => bytes,
                };

                let text = decoder.decode(&chunk);
                for line in lines.push(&text) {
                    for event in events_for_line(&line) {
                        let terminal = event.is_terminal();
                        if matches!(event, StreamEvent::Fragment(_)) {
                            fragments += 1;
                        }
                        yield event;
                        if terminal {
                            tracing::debug!(fragments, "Completion stream finished");
                            return;
                        }
                    }
                }
            }

            // Graceful close without a terminal marker: flush what is left.
            let tail = decoder.finish();
            let mut remaining = lines.push(&tail);
            remaining.extend(lines.finish());
            for line in remaining {
                for event in events_for_line(&line) {
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        return;
                    }
                }
            }

            tracing::debug!(fragments, "Completion stream closed by server");
            yield StreamEvent::Done(None);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAIClient {
        OpenAIClient::new(
            ProviderConfig::new("key")
                .with_model("test-model")
                .with_max_tokens(1_000),
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_declares_stream() {
        let request = CompletionRequest::new(vec![ChatMessage::system("s"), ChatMessage::user("u")]);
        let body = serde_json::to_value(client().request_body(request)).unwrap();

        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 1_000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "u");
    }

    #[test]
    fn test_request_max_tokens_is_bounded_by_config() {
        let request = CompletionRequest::new(vec![]).with_max_tokens(50_000);
        assert_eq!(client().request_body(request).max_tokens, 1_000);

        let request = CompletionRequest::new(vec![]).with_max_tokens(10);
        assert_eq!(client().request_body(request).max_tokens, 10);
    }

    #[test]
    fn test_events_for_data_content_and_finish() {
        let events =
            events_for_data(r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":"stop"}]}"#);
        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment("hi".to_string()),
                StreamEvent::Done(Some(FinishReason::Stop)),
            ]
        );
    }

    #[test]
    fn test_events_for_data_only_first_choice() {
        let events = events_for_data(
            r#"{"choices":[{"delta":{"content":"a"}},{"delta":{"content":"b"}}]}"#,
        );
        assert_eq!(events, vec![StreamEvent::Fragment("a".to_string())]);
    }

    #[test]
    fn test_events_for_data_tolerates_noise() {
        assert!(events_for_data("{invalid json").is_empty());
        assert!(events_for_data(r#"{"choices":[]}"#).is_empty());
        assert!(events_for_data(r#"{"id":"x","object":"chunk"}"#).is_empty());
        assert!(
            events_for_data(r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#)
                .is_empty()
        );
        assert!(events_for_data(r#"{"choices":[{"delta":{"content":""}}]}"#).is_empty());
    }

    #[test]
    fn test_events_for_line_sentinel() {
        assert_eq!(events_for_line("data: [DONE]"), vec![StreamEvent::Done(None)]);
        assert!(events_for_line("").is_empty());
    }
}
