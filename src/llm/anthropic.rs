// ABOUTME: Anthropic messages-API provider implementation for coaching generation
// ABOUTME: Sends one fully-composed user message and returns the text completion

//! # Anthropic Provider
//!
//! Implementation of the [`LlmProvider`] trait against the Anthropic
//! messages API.
//!
//! ## Configuration
//!
//! Set the `ANTHROPIC_API_KEY` environment variable. `ANTHROPIC_MODEL`
//! overrides the default model.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ChatRequest, ChatResponse, LlmProvider};
use crate::errors::{AppError, AppResult};

/// Environment variable for the API key
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Environment variable overriding the model
const MODEL_ENV: &str = "ANTHROPIC_MODEL";

/// Default model for coaching generation
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Messages API endpoint
const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// API version header value
const API_VERSION: &str = "2023-06-01";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Anthropic LLM provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    /// Create a provider with the given API key and model
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    /// Create a provider from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `ANTHROPIC_API_KEY` is not set
    pub fn from_env() -> AppResult<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            AppError::config(format!("Missing {API_KEY_ENV} environment variable"))
        })?;
        let model = std::env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_owned());

        Ok(Self::new(api_key, model))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: m.role.as_str().to_owned(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            "Calling Anthropic API: model={}, max_tokens={}, temperature={}, timeout={:?}",
            self.model, request.max_tokens, request.temperature, request.timeout
        );

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            error!("Anthropic authentication failed - check API key");
            return Err(AppError::external_service(
                "anthropic",
                "authentication failed",
            ));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AppError::external_unavailable(
                "anthropic",
                format!("status {status}"),
            ));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "anthropic",
                format!("status {status}: {text}"),
            ));
        }

        let parsed: AnthropicResponse = response.json().await?;
        let content = parsed
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        debug!("Anthropic response: {} chars", content.len());

        Ok(ChatResponse {
            content,
            model: parsed.model,
        })
    }
}
