//! LLM provider abstraction used by model-backed classifiers

pub mod provider;

pub use provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
    MessageRole, TokenUsage,
};
