use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::orchestrator::{BatchSummary, FileFailure, FileOutcome, Orchestrator, OrchestratorSettings};
use crate::progress::{FileState, ProgressObserver};
use crate::translation::TranslationService;

// @module: Application controller wiring config, backend, orchestrator and terminal progress

const PROGRESS_CHARS: &str = "█▓▒░";

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(mut config: Config) -> Result<Self> {
        config.translation.resolve_auto_provider();
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the orchestrator for the configured provider
    pub fn build_orchestrator(&self) -> Result<(Orchestrator, Arc<TranslationService>)> {
        let service = Arc::new(TranslationService::new(&self.config)?);
        let orchestrator = Orchestrator::new(service.clone(), OrchestratorSettings::from_config(&self.config));
        Ok((orchestrator, service))
    }

    /// Translate a file or every matching file in a directory
    ///
    /// Per-file failures are reported in the summary. Lock contention and
    /// unusable input paths are returned as errors.
    pub async fn run(&self, input_path: &Path, cancel: CancellationToken) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let (orchestrator, service) = self.build_orchestrator()?;

        info!(
            "srtlingo: {} - {} ({} -> {})",
            self.config.translation.provider.display_name(),
            service.model(),
            self.config.source_language,
            self.config.target_language
        );
        if let Err(e) = service.test_connection().await {
            warn!("Connection test failed, continuing anyway: {}", e);
        }

        if let Some(output_dir) = &self.config.pipeline.output_dir {
            FileManager::ensure_dir(output_dir)
                .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
        }

        let progress = TerminalProgress::new();
        let summary = if FileManager::dir_exists(input_path) {
            orchestrator.run_directory(input_path, &progress, &cancel).await?
        } else if FileManager::file_exists(input_path) {
            Self::single_file_summary(input_path, orchestrator.run_file(input_path, &progress, &cancel).await)?
        } else {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        };
        progress.finish();

        let stats = service.cache_stats();
        if stats.hits > 0 {
            info!("Cache: {} hits, {} misses ({:.0}% hit rate)", stats.hits, stats.misses, stats.hit_rate() * 100.0);
        }
        Self::log_summary(&summary, start_time.elapsed());
        Ok(summary)
    }

    fn single_file_summary(path: &Path, result: Result<FileOutcome, TranslationError>) -> Result<BatchSummary> {
        let mut summary = BatchSummary {
            attempted: 1,
            ..BatchSummary::default()
        };
        match result {
            Ok(FileOutcome::Completed { output_path, .. }) => summary.completed.push(output_path),
            Ok(FileOutcome::Skipped { output_path }) => summary.skipped.push(output_path),
            Err(TranslationError::Cancelled) => summary.cancelled = true,
            Err(e @ TranslationError::AlreadyRunning { .. }) => return Err(e.into()),
            Err(e) => summary.failed.push(FileFailure {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
        Ok(summary)
    }

    fn log_summary(summary: &BatchSummary, elapsed: Duration) {
        for path in &summary.completed {
            info!("Success: {}", path.display());
        }
        for path in &summary.skipped {
            info!("Up to date: {}", path.display());
        }
        for failure in &summary.failed {
            error!("Failed: {} ({})", failure.path.display(), failure.reason);
        }
        if summary.cancelled {
            warn!("Run cancelled, remaining files were not processed");
        }
        info!(
            "Processing completed in {}: {} translated, {} skipped, {} failed",
            Self::format_duration(elapsed),
            summary.completed.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Cancel `token` on the first Ctrl-C
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing requests in flight…");
            token.cancel();
        }
    });
}

/// indicatif renderer: one bar per file in flight plus a folder bar
struct TerminalProgress {
    multi: MultiProgress,
    folder_bar: Mutex<Option<ProgressBar>>,
    file_bars: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            folder_bar: Mutex::new(None),
            file_bars: Mutex::new(HashMap::new()),
        }
    }

    fn style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(PROGRESS_CHARS)
    }

    fn finish(&self) {
        if let Some(bar) = self.folder_bar.lock().take() {
            bar.finish_with_message("Folder processing complete");
        }
        for (_, bar) in self.file_bars.lock().drain() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_file_started(&self, path: &Path, total_entries: usize) {
        let bar = self.multi.add(ProgressBar::new(total_entries as u64));
        bar.set_style(Self::style("entries"));
        let name = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
        bar.set_message(name);
        self.file_bars.lock().insert(path.to_path_buf(), bar);
    }

    fn on_entry_progress(&self, path: &Path, completed: usize, _total: usize) {
        if let Some(bar) = self.file_bars.lock().get(path) {
            bar.set_position(completed as u64);
        }
    }

    fn on_file_finished(&self, path: &Path, state: FileState) {
        if let Some(bar) = self.file_bars.lock().remove(path) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
        if state == FileState::Failed {
            if let Some(folder) = self.folder_bar.lock().as_ref() {
                folder.set_message(format!("Failed: {}", path.display()));
            }
        }
    }

    fn on_batch_progress(&self, files_done: usize, files_total: usize) {
        let mut folder = self.folder_bar.lock();
        let bar = folder.get_or_insert_with(|| {
            let bar = self.multi.insert(0, ProgressBar::new(files_total as u64));
            bar.set_style(Self::style("files"));
            bar.set_message("Processing files");
            bar
        });
        bar.set_length(files_total as u64);
        bar.set_position(files_done as u64);
    }
}
