use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Provider, build_http_client, ensure_success, join_endpoint};
use crate::errors::ProviderError;

/// Client for the OpenAI chat completions API
///
/// Also used for OpenAI-compatible servers such as LM Studio and DeepSeek,
/// which differ only in endpoint and whether a key is sent.
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn completions_url(&self) -> String {
        join_endpoint(&self.endpoint, "chat/completions")
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = ChatCompletionRequest;
    type Response = ChatCompletionResponse;

    async fn complete(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        let mut builder = self.client.post(self.completions_url()).json(&request);
        // Local servers run without a key
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(ProviderError::from_reqwest)?;
        let response = ensure_success("OpenAI", response).await?;
        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ChatCompletionRequest::new(self.model.clone())
            .add_message("user", "Hello")
            .max_tokens(5);
        self.complete(request).await.map(|_| ())
    }

    fn extract_text(response: &ChatCompletionResponse) -> String {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}
