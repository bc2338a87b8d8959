//! LLM module - streaming completion ingestion

mod client;
mod config;
mod mock_client;
mod openai;
mod sse;

pub use client::{
    ChatMessage, CompletionRequest, EventStream, FinishReason, Role, StreamEvent, StreamFailure,
    StreamingClient,
};
pub use config::{
    DEFAULT_API_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ProviderConfig,
};
pub use mock_client::{MockStream, MockStreamClient};
pub use openai::OpenAIClient;
