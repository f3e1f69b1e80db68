/*!
 * Common test utilities for the srtlingo test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use srtlingo::orchestrator::{Orchestrator, OrchestratorSettings};
use srtlingo::providers::mock::MockProvider;
use srtlingo::subtitle_processor::SubtitleDocument;
use srtlingo::translation::RetryPolicy;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, &srt_from_texts(&["Hello", "Good morning", "See you"]))
}

/// SRT content with one two-second entry per text
pub fn srt_from_texts(texts: &[&str]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let start = i as u64 * 3;
            format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\n{}\n",
                i + 1,
                start,
                start + 2,
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Orchestrator settings scoped to `dir`, en -> `target`, no backoff delays
pub fn test_settings(dir: &Path, target: &str) -> OrchestratorSettings {
    OrchestratorSettings {
        source_language: "en".to_string(),
        target_language: target.to_string(),
        concurrency_limit: 4,
        retry: RetryPolicy::immediate(3),
        output_dir: None,
        file_pattern: "*.srt".to_string(),
        recursive: false,
        lock_path: dir.join(".srtlingo.lock"),
        lock_stale_after: None,
    }
}

/// Orchestrator over a clone of `backend`, so the caller keeps its counters
pub fn mock_orchestrator(backend: &MockProvider, settings: OrchestratorSettings) -> Orchestrator {
    Orchestrator::new(Arc::new(backend.clone()), settings)
}

/// Texts of a written SRT file
pub fn read_texts(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    Ok(SubtitleDocument::parse(&bytes)?.texts())
}

/// Names of the files directly inside `dir`, sorted
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

/// Route library logs to the test harness, RUST_LOG picks the level
pub fn init_test_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}
