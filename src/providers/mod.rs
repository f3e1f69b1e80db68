/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and OpenAI-compatible servers (LM Studio, DeepSeek)
 * - Anthropic: Anthropic API integration
 * - Mock: Deterministic in-process provider for tests and dry runs
 *
 * Clients only speak their wire protocol. Retries, timeouts around whole
 * requests and caching belong to the translation layer.
 */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably in the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Build the HTTP client shared by the network providers
pub(crate) fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Turn a non-success HTTP response into a classified provider error
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::debug!("{} API error ({}): {}", provider, status, body);
    Err(ProviderError::from_status(status.as_u16(), body))
}

/// Join a base endpoint and a path without doubling slashes
pub(crate) fn join_endpoint(endpoint: &str, path: &str) -> String {
    format!("{}/{}", endpoint.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
