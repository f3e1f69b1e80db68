use std::path::PathBuf;

use anyhow::{Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code or name, `auto` to let the model detect it
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code or name
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// File discovery, output and locking
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
    // @provider: DeepSeek (OpenAI-compatible hosted API)
    DeepSeek,
    // @provider: In-process mock, no network
    Mock,
    // @provider: First provider with an API key, resolved before use
    Auto,
}

impl TranslationProvider {
    pub const ALL: [TranslationProvider; 6] = [
        Self::Ollama,
        Self::OpenAI,
        Self::Anthropic,
        Self::LMStudio,
        Self::DeepSeek,
        Self::Mock,
    ];

    /// Candidates for `Auto`, most preferred first; `Mock` when none has a key
    pub const AUTO_PREFERENCE: [TranslationProvider; 3] = [Self::OpenAI, Self::DeepSeek, Self::Anthropic];

    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
            Self::DeepSeek => "DeepSeek",
            Self::Mock => "Mock",
            Self::Auto => "Auto",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::LMStudio => "lmstudio",
            Self::DeepSeek => "deepseek",
            Self::Mock => "mock",
            Self::Auto => "auto",
        }
        .to_string()
    }

    // @returns: Whether the hosted API rejects requests without a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic | Self::DeepSeek)
    }

    // @returns: Environment variable consulted when no key is configured
    pub fn api_key_env_var(&self) -> String {
        format!("{}_API_KEY", self.to_lowercase_string().to_uppercase())
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_lowercase();
        Self::ALL
            .into_iter()
            .chain([Self::Auto])
            .find(|provider| provider.to_lowercase_string() == wanted)
            .ok_or_else(|| anyhow!("Invalid provider type: {}", s))
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key, falls back to the provider's environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests per file
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Requests per minute across all files, None for no limit
    #[serde(default)]
    pub rate_limit_rpm: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(provider_type),
            concurrent_requests: match provider_type {
                // Local servers serialize generation anyway
                TranslationProvider::Ollama | TranslationProvider::LMStudio => 2,
                _ => default_concurrent_requests(),
            },
            timeout_secs: match provider_type {
                TranslationProvider::Anthropic => 60,
                _ => default_timeout_secs(),
            },
            rate_limit_rpm: default_rate_limit_rpm(provider_type),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Attempts per entry, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, doubled on each further retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reuse translations of repeated lines within a run
    #[serde(default = "default_true")]
    pub enable_cache: bool,

    /// Cache capacity before least recently used lines are evicted, 0 for no limit
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
            temperature: default_temperature(),
            enable_cache: true,
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

/// File discovery, output placement and run locking
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Glob matched against file names in directory runs
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Output directory, defaults to the input file's directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Lock file path, relative paths resolve against the working directory
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Treat locks older than this as stale even if the owner looks alive
    #[serde(default)]
    pub lock_stale_after_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file_pattern: default_file_pattern(),
            recursive: false,
            output_dir: None,
            lock_file: default_lock_file(),
            lock_stale_after_secs: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    language_utils::AUTO_LANGUAGE.to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_retry_max_backoff_ms() -> u64 {
    30_000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_cache_max_entries() -> usize {
    crate::translation::cache::DEFAULT_MAX_ENTRIES
}

fn default_rate_limit_rpm(provider: TranslationProvider) -> Option<u32> {
    match provider {
        // Just below Anthropic's standard 50 requests per minute
        TranslationProvider::Anthropic => Some(45),
        TranslationProvider::OpenAI => Some(60),
        // Local servers and the mock are not limited
        _ => None,
    }
}

fn default_true() -> bool {
    true
}

fn default_file_pattern() -> String {
    "*.srt".to_string()
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(".srtlingo.lock")
}

fn default_endpoint(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "http://localhost:11434",
        TranslationProvider::OpenAI => "https://api.openai.com/v1",
        TranslationProvider::Anthropic => "https://api.anthropic.com",
        // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
        TranslationProvider::LMStudio => "http://localhost:1234/v1",
        TranslationProvider::DeepSeek => "https://api.deepseek.com/v1",
        TranslationProvider::Mock | TranslationProvider::Auto => "",
    }
    .to_string()
}

fn default_model(provider: TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "llama3.2:3b",
        TranslationProvider::OpenAI => "gpt-4o-mini",
        TranslationProvider::Anthropic => "claude-3-haiku-20240307",
        // Placeholder; users should set to the loaded model name in LM Studio
        TranslationProvider::LMStudio => "local-model",
        TranslationProvider::DeepSeek => "deepseek-chat",
        TranslationProvider::Mock => "mock",
        TranslationProvider::Auto => "",
    }
    .to_string()
}

fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate the user's text from {source_language} to {target_language}. Keep line breaks and inline markup such as <i> or {\\an8} exactly as they are. Reply with the translation only, without notes or explanations.".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        language_utils::validate_language(&self.source_language, true)
            .map_err(|e| anyhow!("Invalid source language: {}", e))?;
        language_utils::validate_language(&self.target_language, false)
            .map_err(|e| anyhow!("Invalid target language: {}", e))?;

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set it in the config or {})",
                provider.display_name(),
                provider.api_key_env_var()
            ));
        }

        if self.translation.optimal_concurrent_requests() == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.translation.common.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }

        crate::file_utils::FileManager::glob_to_regex(&self.pipeline.file_pattern)
            .map_err(|e| anyhow!("Invalid file pattern '{}': {}", self.pipeline.file_pattern, e))?;

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: "fr".to_string(),
            translation: TranslationConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Replace `Auto` with the first provider that has an API key
    ///
    /// Keys count when set in the provider's config entry or in its
    /// `{PROVIDER}_API_KEY` environment variable. Falls back to `Mock`.
    pub fn resolve_auto_provider(&mut self) -> TranslationProvider {
        self.resolve_auto_provider_with(|name| std::env::var(name).ok())
    }

    /// [`Self::resolve_auto_provider`] with an explicit environment lookup
    pub fn resolve_auto_provider_with<F>(&mut self, env: F) -> TranslationProvider
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider != TranslationProvider::Auto {
            return self.provider;
        }

        let resolved = TranslationProvider::AUTO_PREFERENCE
            .into_iter()
            .find(|candidate| {
                let configured = self
                    .get_provider_config(candidate)
                    .is_some_and(|p| !p.api_key.is_empty());
                configured || env(&candidate.api_key_env_var()).is_some_and(|key| !key.is_empty())
            })
            .unwrap_or(TranslationProvider::Mock);

        info!("Auto provider selection picked {}", resolved.display_name());
        self.provider = resolved;
        resolved
    }

    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider entry, created when missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| default_model(self.provider))
    }

    /// Get the API key for the active provider, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if let Some(key) = self.get_active_provider_config().map(|p| p.api_key.clone()) {
            if !key.is_empty() {
                return key;
            }
        }
        std::env::var(self.provider.api_key_env_var()).unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or_else(|| default_endpoint(self.provider))
    }

    /// Requests-per-minute limit of the active provider
    pub fn get_rate_limit_rpm(&self) -> Option<u32> {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.rate_limit_rpm,
            None => default_rate_limit_rpm(self.provider),
        }
        .filter(|rpm| *rpm > 0)
    }

    /// Per-request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: TranslationProvider::ALL.into_iter().map(ProviderConfig::new).collect(),
            common: TranslationCommonConfig::default(),
        }
    }
}
