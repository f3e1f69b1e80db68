/*!
 * Integration tests for the per-file translation pipeline
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use srtlingo::app_config::{Config, TranslationProvider};
use srtlingo::errors::{BackendErrorKind, TranslationError};
use srtlingo::orchestrator::{FileOutcome, Orchestrator, OrchestratorSettings};
use srtlingo::progress::{NoopProgress, ProgressEvent, ProgressFn};
use srtlingo::providers::mock::MockProvider;
use srtlingo::translation::{RetryPolicy, TranslationBackend, TranslationService};
use crate::common;

fn completed_path(outcome: FileOutcome) -> std::path::PathBuf {
    match outcome {
        FileOutcome::Completed { output_path, .. } => output_path,
        FileOutcome::Skipped { output_path } => panic!("unexpected skip of {:?}", output_path),
    }
}

#[tokio::test]
async fn test_translateFile_withMockService_shouldTagEveryEntryWithLanguageName() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "greetings.srt")?;

    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "es".to_string();
    config.translation.provider = TranslationProvider::Mock;
    config.pipeline.lock_file = temp_dir.path().join(".srtlingo.lock");
    let service = Arc::new(TranslationService::new(&config)?);
    let orchestrator = Orchestrator::new(service, OrchestratorSettings::from_config(&config));

    let outcome = orchestrator.run_file(&input, &NoopProgress, &CancellationToken::new()).await?;
    let output = completed_path(outcome);

    assert_eq!(
        common::read_texts(&output)?,
        vec!["[Spanish] Hello", "[Spanish] Good morning", "[Spanish] See you"]
    );
    let written = fs::read_to_string(&output)?;
    assert!(written.starts_with("1\n00:00:00,000 --> 00:00:02,500\n"));
    Ok(())
}

#[tokio::test]
async fn test_translateFile_secondRun_shouldSkipWithZeroBackendCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::working();
    let orchestrator = common::mock_orchestrator(&backend, common::test_settings(temp_dir.path(), "es"));
    let cancel = CancellationToken::new();

    let first = orchestrator.run_file(&input, &NoopProgress, &cancel).await?;
    let files_after_first = common::file_names(temp_dir.path())?;
    let calls_after_first = backend.request_count();
    assert_eq!(calls_after_first, 3);

    let second = orchestrator.run_file(&input, &NoopProgress, &cancel).await?;
    assert_eq!(second, FileOutcome::Skipped { output_path: first.output_path().to_path_buf() });
    assert_eq!(backend.request_count(), calls_after_first);
    assert_eq!(common::file_names(temp_dir.path())?, files_after_first);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withEditedInput_shouldWriteNewOutputAndKeepOld() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::working();
    let orchestrator = common::mock_orchestrator(&backend, common::test_settings(temp_dir.path(), "es"));
    let cancel = CancellationToken::new();

    let first = completed_path(orchestrator.run_file(&input, &NoopProgress, &cancel).await?);
    common::create_test_file(temp_dir.path(), "movie.srt", &common::srt_from_texts(&["Hello", "Good morning", "See you!"]))?;
    let second = completed_path(orchestrator.run_file(&input, &NoopProgress, &cancel).await?);

    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
    assert_eq!(common::read_texts(&second)?[2], "[es] See you!");
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withRandomLatency_shouldPreserveOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let lines: Vec<String> = (1..=40).map(|i| format!("Line number {}", i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let input = common::create_test_file(temp_dir.path(), "long.srt", &common::srt_from_texts(&refs))?;

    let backend = MockProvider::random_delay(15);
    let mut settings = common::test_settings(temp_dir.path(), "fr");
    settings.concurrency_limit = 8;
    let orchestrator = common::mock_orchestrator(&backend, settings);

    let output = completed_path(orchestrator.run_file(&input, &NoopProgress, &CancellationToken::new()).await?);

    let expected: Vec<String> = lines.iter().map(|line| MockProvider::tagged(line, "fr")).collect();
    assert_eq!(common::read_texts(&output)?, expected);
    assert!(backend.max_in_flight() <= 8);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withFailuresBelowCeiling_shouldSucceed() -> Result<()> {
    const K: u32 = 4;
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::fail_times((K - 1) as usize, BackendErrorKind::RateLimited);
    let mut settings = common::test_settings(temp_dir.path(), "es");
    settings.retry = RetryPolicy::immediate(K);
    let orchestrator = common::mock_orchestrator(&backend, settings);

    orchestrator.run_file(&input, &NoopProgress, &CancellationToken::new()).await?;

    assert_eq!(backend.attempts_for("Hello"), K as usize);
    assert_eq!(backend.request_count(), 3 * K as usize);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withFailuresAtCeiling_shouldFailWithoutOutput() -> Result<()> {
    const K: u32 = 4;
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::fail_times((K - 1) as usize, BackendErrorKind::Timeout);
    let mut settings = common::test_settings(temp_dir.path(), "es");
    settings.retry = RetryPolicy::immediate(K - 1);
    settings.concurrency_limit = 1;
    let orchestrator = common::mock_orchestrator(&backend, settings);

    let err = orchestrator
        .run_file(&input, &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TranslationError::Backend { entry, attempts, source } => {
            assert_eq!(entry, 1);
            assert_eq!(attempts, K - 1);
            assert_eq!(source.kind, BackendErrorKind::Timeout);
        }
        other => panic!("expected a backend error, got {:?}", other),
    }
    assert_eq!(common::file_names(temp_dir.path())?, vec!["movie.srt"]);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withUnauthorized_shouldCallOnceAndStop() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::failing(BackendErrorKind::Unauthorized);
    let mut settings = common::test_settings(temp_dir.path(), "es");
    settings.concurrency_limit = 1;
    settings.retry = RetryPolicy::immediate(5);
    let orchestrator = common::mock_orchestrator(&backend, settings);

    let err = orchestrator
        .run_file(&input, &NoopProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TranslationError::Backend { attempts: 1, .. }), "{err:?}");
    assert_eq!(backend.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withBlankEntry_shouldNotSendIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = "1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nReal text\n";
    let input = common::create_test_file(temp_dir.path(), "gap.srt", content)?;
    let backend = MockProvider::working();
    let orchestrator = common::mock_orchestrator(&backend, common::test_settings(temp_dir.path(), "es"));

    let output = completed_path(orchestrator.run_file(&input, &NoopProgress, &CancellationToken::new()).await?);

    assert_eq!(backend.request_count(), 1);
    assert_eq!(common::read_texts(&output)?, vec!["", "[es] Real text"]);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_shouldReportMonotonicEntryProgress() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let backend = MockProvider::random_delay(5);
    let orchestrator = common::mock_orchestrator(&backend, common::test_settings(temp_dir.path(), "es"));
    let ticks = parking_lot::Mutex::new(Vec::new());
    let observer = ProgressFn(|event| {
        if let ProgressEvent::Entry { completed, total, .. } = event {
            ticks.lock().push((completed, total));
        }
    });

    orchestrator.run_file(&input, &observer, &CancellationToken::new()).await?;

    let ticks = ticks.into_inner();
    assert_eq!(ticks, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    Ok(())
}

/// The mock service is usable from synchronous code too
#[test]
fn test_mockService_translateBatch_shouldKeepOrderAndHitCache() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Mock;
    let service = TranslationService::new(&config).unwrap();
    let texts = vec!["Hi".to_string(), "Bye".to_string(), "Hi".to_string()];

    let result = tokio_test::block_on(service.translate_batch(&texts, "de"));

    tokio_test::assert_ok!(&result);
    assert_eq!(result.unwrap(), vec!["[German] Hi", "[German] Bye", "[German] Hi"]);
    assert_eq!(service.cache_stats().entries, 2);
}
