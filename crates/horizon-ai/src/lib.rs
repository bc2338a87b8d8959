//! Event Horizon AI - streaming ingestion for live HTML generation
//!
//! This crate provides:
//! - Stream ingestor for OpenAI-compatible chat completion event streams
//! - Content segmenter separating `<think>` reasoning, visible text and the
//!   embedded HTML document
//! - Turn runner tying both together for one conversation turn

mod http_client;

pub mod error;
pub mod llm;
pub mod prompt;
pub mod segment;
pub mod text_utils;
pub mod turn;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use llm::{
    ChatMessage, CompletionRequest, EventStream, FinishReason, MockStream, MockStreamClient,
    OpenAIClient, ProviderConfig, Role, StreamEvent, StreamFailure, StreamingClient,
};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use segment::{CodePayload, PayloadSource, PayloadTracker, Segmentation, segment};
pub use tokio_util::sync::CancellationToken;
pub use turn::{
    ChannelEmitter, NullEmitter, TurnEmitter, TurnEvent, TurnOutcome, TurnRunner, TurnStatus,
};
