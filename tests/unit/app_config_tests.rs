/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;
use std::time::Duration;

use srtlingo::app_config::{Config, LogLevel, TranslationProvider};
use srtlingo::orchestrator::OrchestratorSettings;

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.max_attempts, 3);
    assert_eq!(config.translation.common.retry_backoff_ms, 1000);
    assert!(config.translation.common.enable_cache);
    assert_eq!(config.pipeline.file_pattern, "*.srt");
    assert_eq!(config.pipeline.lock_file, PathBuf::from(".srtlingo.lock"));
    assert_eq!(config.log_level, LogLevel::Info);

    for provider in TranslationProvider::ALL {
        assert!(config.translation.get_provider_config(&provider).is_some(), "{provider}");
    }
}

#[test]
fn test_configJson_withPipelineSection_shouldDeserialize() {
    let json = r#"{
        "target_language": "de",
        "log_level": "debug",
        "translation": {
            "provider": "deepseek",
            "available_providers": [
                { "type": "deepseek", "model": "deepseek-chat", "api_key": "k", "concurrent_requests": 6 }
            ],
            "common": { "max_attempts": 5, "retry_backoff_ms": 10 }
        },
        "pipeline": { "recursive": true, "output_dir": "translated", "lock_stale_after_secs": 120 }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.source_language, "auto");
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.translation.provider, TranslationProvider::DeepSeek);
    assert_eq!(config.translation.get_endpoint(), "https://api.deepseek.com/v1");
    assert!(config.validate().is_ok());

    let settings = OrchestratorSettings::from_config(&config);
    assert_eq!(settings.concurrency_limit, 6);
    assert_eq!(settings.retry.max_attempts, 5);
    assert_eq!(settings.retry.delay_for(1), Duration::from_millis(10));
    assert_eq!(settings.output_dir, Some(PathBuf::from("translated")));
    assert_eq!(settings.lock_stale_after, Some(Duration::from_secs(120)));
    assert!(settings.recursive);
}

#[test]
fn test_configJson_shouldRoundTripThroughSerde() {
    let mut config = Config::default();
    config.target_language = "ja".to_string();
    config.pipeline.output_dir = Some(PathBuf::from("/tmp/out"));

    let json = serde_json::to_string_pretty(&config).unwrap();
    let back: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(back.target_language, "ja");
    assert_eq!(back.pipeline.output_dir, config.pipeline.output_dir);
    assert_eq!(back.translation.available_providers.len(), config.translation.available_providers.len());
}

#[test]
fn test_validate_withZeroConcurrency_shouldFail() {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().concurrent_requests = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withBrokenFilePattern_shouldFail() {
    let mut config = Config::default();
    config.pipeline.file_pattern = "[".to_string();
    assert!(config.validate().is_err());
}

fn env_with<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |name: &str| vars.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
}

#[test]
fn test_resolveAutoProvider_withEnvKeys_shouldPreferOpenAiThenDeepSeek() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Auto;
    let resolved = config
        .translation
        .resolve_auto_provider_with(env_with(&[("DEEPSEEK_API_KEY", "sk-d"), ("OPENAI_API_KEY", "sk-o")]));
    assert_eq!(resolved, TranslationProvider::OpenAI);

    config.translation.provider = TranslationProvider::Auto;
    let resolved = config
        .translation
        .resolve_auto_provider_with(env_with(&[("DEEPSEEK_API_KEY", "sk-d"), ("ANTHROPIC_API_KEY", "sk-a")]));
    assert_eq!(resolved, TranslationProvider::DeepSeek);
    assert_eq!(config.translation.provider, TranslationProvider::DeepSeek);
}

#[test]
fn test_resolveAutoProvider_withoutKeys_shouldFallBackToMock() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Auto;
    let resolved = config.translation.resolve_auto_provider_with(env_with(&[("OPENAI_API_KEY", "")]));
    assert_eq!(resolved, TranslationProvider::Mock);
}

#[test]
fn test_resolveAutoProvider_withConfiguredKey_shouldIgnoreEnvironment() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.active_provider_config_mut().api_key = "sk-a".to_string();
    config.translation.provider = TranslationProvider::Auto;

    assert_eq!(config.translation.resolve_auto_provider_with(|_| None), TranslationProvider::Anthropic);
}

#[test]
fn test_resolveAutoProvider_withConcreteProvider_shouldKeepIt() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    let resolved = config.translation.resolve_auto_provider_with(env_with(&[("OPENAI_API_KEY", "sk-o")]));
    assert_eq!(resolved, TranslationProvider::Ollama);
}

#[test]
fn test_configJson_withAutoProvider_shouldParse() {
    let config: Config = serde_json::from_str(r#"{"target_language": "es", "translation": {"provider": "auto"}}"#).unwrap();
    assert_eq!(config.translation.provider, TranslationProvider::Auto);
    assert_eq!("auto".parse::<TranslationProvider>().unwrap(), TranslationProvider::Auto);
}

#[test]
fn test_rateLimit_shouldFollowProviderDefaultsAndOverrides() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Anthropic;
    assert_eq!(config.translation.get_rate_limit_rpm(), Some(45));

    config.translation.provider = TranslationProvider::Ollama;
    assert_eq!(config.translation.get_rate_limit_rpm(), None);

    config.translation.active_provider_config_mut().rate_limit_rpm = Some(12);
    assert_eq!(config.translation.get_rate_limit_rpm(), Some(12));
}

#[test]
fn test_configJson_withCacheLimit_shouldDeserialize() {
    let config: Config = serde_json::from_str(r#"{"target_language": "es"}"#).unwrap();
    assert_eq!(config.translation.common.cache_max_entries, 1000);

    let json = r#"{"target_language": "es", "translation": {"common": {"cache_max_entries": 10}}}"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.translation.common.cache_max_entries, 10);
}
