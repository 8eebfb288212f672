//! llm-client-rs
//!
//! HTTP client for OpenAI-compatible chat-completions providers, plus the
//! best-effort JSON extraction used on model output. The specialist agents
//! drive this client with per-role temperatures and bound tool schemas.

pub mod client;
pub mod extract;

pub use client::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, FunctionCall,
    FunctionSchema, LlmClient, LlmClientBuilder, LlmError, ToolCall, ToolSchema, Usage,
};
pub use extract::{extract_json_object, Extraction};
