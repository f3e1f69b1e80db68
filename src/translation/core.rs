/*!
 * Core translation service implementation.
 *
 * `TranslationService` resolves the configured provider once and exposes it
 * through the `TranslationBackend` trait. It owns the per-request timeout,
 * the rate limit, the prompt and the in-run cache; retries are left to the
 * orchestrator.
 */

use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::backend::TranslationBackend;
use super::cache::{CacheStats, TranslationCache, truncate_text};
use super::rate_limit::RateLimiter;
use crate::app_config::{Config, TranslationProvider};
use crate::errors::BackendError;
use crate::language_utils;
use crate::providers::Provider;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{ChatCompletionRequest, OpenAI};

/// Completion budget for a single subtitle entry
const MAX_COMPLETION_TOKENS: u32 = 1024;

/// Translation provider implementation variants
#[derive(Debug)]
enum TranslationProviderImpl {
    Ollama { client: Ollama },
    /// OpenAI and the OpenAI-compatible servers
    OpenAI { client: OpenAI },
    Anthropic { client: Anthropic },
    Mock { client: MockProvider },
}

/// Provider-backed implementation of [`TranslationBackend`]
#[derive(Debug)]
pub struct TranslationService {
    provider: TranslationProviderImpl,
    provider_kind: TranslationProvider,
    name: String,
    model: String,
    source_language: String,
    system_prompt_template: String,
    temperature: f32,
    request_timeout: Duration,
    rate_limiter: Option<RateLimiter>,
    cache: TranslationCache,
}

impl TranslationService {
    /// Build the service for the provider selected in `config`
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut translation = config.translation.clone();
        translation.resolve_auto_provider();
        let translation = &translation;
        let provider_kind = translation.provider;
        let model = translation.get_model();
        let endpoint = translation.get_endpoint();
        let api_key = translation.get_api_key();
        let request_timeout = Duration::from_secs(translation.get_timeout_secs());

        if provider_kind != TranslationProvider::Mock {
            if endpoint.is_empty() {
                return Err(anyhow::anyhow!("No endpoint configured for {}", provider_kind.display_name()));
            }
            url::Url::parse(&endpoint).map_err(|e| {
                anyhow::anyhow!("Invalid endpoint '{}' for {}: {}", endpoint, provider_kind.display_name(), e)
            })?;
        }

        let provider = match provider_kind {
            TranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::from_url(endpoint, model.clone(), request_timeout),
            },
            TranslationProvider::OpenAI | TranslationProvider::LMStudio | TranslationProvider::DeepSeek => {
                TranslationProviderImpl::OpenAI {
                    client: OpenAI::new(api_key, endpoint, model.clone(), request_timeout),
                }
            }
            TranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(api_key, endpoint, model.clone(), request_timeout),
            },
            TranslationProvider::Mock | TranslationProvider::Auto => TranslationProviderImpl::Mock {
                client: MockProvider::working(),
            },
        };

        Ok(Self {
            provider,
            provider_kind,
            name: format!("{} ({})", provider_kind.display_name(), model),
            model,
            source_language: config.source_language.clone(),
            system_prompt_template: translation.common.system_prompt.clone(),
            temperature: translation.common.temperature,
            request_timeout,
            rate_limiter: translation.get_rate_limit_rpm().map(RateLimiter::per_minute),
            cache: TranslationCache::new(translation.common.enable_cache, translation.common.cache_max_entries),
        })
    }

    pub fn provider(&self) -> TranslationProvider {
        self.provider_kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fill the prompt template for one target language
    pub fn system_prompt(&self, target_language: &str) -> String {
        let source = if self.source_language.eq_ignore_ascii_case(language_utils::AUTO_LANGUAGE) {
            "the source language".to_string()
        } else {
            language_utils::prompt_language_name(&self.source_language)
        };
        self.system_prompt_template
            .replace("{source_language}", &source)
            .replace("{target_language}", &language_utils::prompt_language_name(target_language))
    }

    /// Test the connection to the configured provider
    pub async fn test_connection(&self) -> Result<(), BackendError> {
        let result = match &self.provider {
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
            TranslationProviderImpl::OpenAI { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Mock { client } => client.test_connection().await,
        };
        result.map_err(BackendError::from)
    }

    async fn complete_text(&self, system_prompt: String, text: &str, target_language: &str) -> Result<String, BackendError> {
        let completion = match &self.provider {
            TranslationProviderImpl::Ollama { client } => {
                let request = GenerationRequest::new(self.model.clone(), text)
                    .system(system_prompt)
                    .temperature(self.temperature);
                client.complete(request).await.map(|r| Ollama::extract_text(&r))
            }
            TranslationProviderImpl::OpenAI { client } => {
                let request = ChatCompletionRequest::new(self.model.clone())
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(self.temperature)
                    .max_tokens(MAX_COMPLETION_TOKENS);
                client.complete(request).await.map(|r| OpenAI::extract_text(&r))
            }
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(self.model.clone(), MAX_COMPLETION_TOKENS)
                    .system(system_prompt)
                    .temperature(self.temperature)
                    .add_message("user", text);
                client.complete(request).await.map(|r| Anthropic::extract_text(&r))
            }
            TranslationProviderImpl::Mock { client } => {
                let request = MockRequest {
                    text: text.to_string(),
                    target_language: language_utils::prompt_language_name(target_language),
                };
                client.complete(request).await.map(|r| MockProvider::extract_text(&r))
            }
        };
        completion.map_err(BackendError::from)
    }
}

#[async_trait]
impl TranslationBackend for TranslationService {
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, BackendError> {
        if let Some(cached) = self.cache.get(text, &self.source_language, target_language) {
            return Ok(cached);
        }

        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire().await;
        }

        let system_prompt = self.system_prompt(target_language);
        let completion = tokio::time::timeout(self.request_timeout, self.complete_text(system_prompt, text, target_language))
            .await
            .map_err(|_| {
                BackendError::timeout(format!(
                    "{} did not answer within {:?}",
                    self.provider_kind.display_name(),
                    self.request_timeout
                ))
            })??;

        let translated = completion.trim();
        if translated.is_empty() {
            return Err(BackendError::invalid_response(format!(
                "{} returned an empty translation",
                self.provider_kind.display_name()
            )));
        }

        debug!("Translated '{}' -> '{}'", truncate_text(text, 30), truncate_text(translated, 30));
        self.cache.store(text, &self.source_language, target_language, translated);
        Ok(translated.to_string())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
