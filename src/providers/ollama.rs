use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Provider, build_http_client, ensure_success, join_endpoint};
use crate::errors::ProviderError;

/// Ollama client for the local generate API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model used for connection tests
    model: String,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Non-streamed generate response
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    pub model: String,
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: false,
        }
    }

    /// Set the system message
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature parameter
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

impl Ollama {
    /// Create a client for a full base URL such as `http://localhost:11434`
    pub fn from_url(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: url.into(),
            client: build_http_client(timeout),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let response = self
            .client
            .post(join_endpoint(&self.base_url, "api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let response = ensure_success("Ollama", response).await?;
        response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(join_endpoint(&self.base_url, "api/version"))
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;
        ensure_success("Ollama", response).await.map(|_| ())
    }

    fn extract_text(response: &GenerationResponse) -> String {
        response.response.clone()
    }
}
