// ABOUTME: LLM provider abstraction for coaching text generation
// ABOUTME: Defines chat request/response types and the provider trait seam

//! # LLM Provider Layer
//!
//! The recommendation pipeline talks to the LLM through the
//! [`LlmProvider`] trait: one fully-composed user message in, one text
//! completion out. Anthropic's messages API is the production
//! implementation; tests substitute deterministic fakes.

pub mod anthropic;

pub use anthropic::AnthropicProvider;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Message authored by the application
    User,
    /// Message authored by the model
    Assistant,
}

impl ChatRole {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation; recommendation prompts are a single user message
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token budget
    pub max_tokens: u32,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl ChatRequest {
    /// Build a request with the given sampling settings
    #[must_use]
    pub fn new(
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            messages,
            temperature,
            max_tokens,
            timeout,
        }
    }
}

/// A chat completion response
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Completion text
    pub content: String,
    /// Model that produced the completion
    pub model: String,
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Execute a completion request
    ///
    /// # Errors
    ///
    /// Returns a transient error for 5xx/network/timeout failures and an
    /// external service error when the request is rejected
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}
