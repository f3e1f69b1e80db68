/*!
 * Translation orchestrator.
 *
 * Drives the per-file pipeline (read, parse, fingerprint, skip check,
 * concurrent translation, rebuild, write) and directory runs on top of it.
 * The orchestrator depends only on the `TranslationBackend` trait; which
 * provider sits behind it is decided by whoever builds the orchestrator.
 *
 * Per-file states: `Pending -> Skipped`, or `Pending -> Translating ->
 * Completed | Failed`. Directory runs keep going past failed files and
 * report every skip and failure in the returned `BatchSummary`.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::file_utils::FileManager;
use crate::ledger::{Fingerprint, OutputNameMatcher, RunLock, output_path};
use crate::progress::{FileState, ProgressObserver};
use crate::subtitle_processor::SubtitleDocument;
use crate::translation::backend::TranslationBackend;
use crate::translation::batch::BatchTranslator;
use crate::translation::retry::RetryPolicy;

/// Everything needed to translate one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub input_path: PathBuf,
    pub source_language: String,
    pub target_language: String,
    pub output_dir: PathBuf,
    pub concurrency_limit: usize,
}

impl JobDescriptor {
    /// Output path for the given content fingerprint
    pub fn output_path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        output_path(
            &self.input_path,
            &self.output_dir,
            &self.source_language,
            &self.target_language,
            fingerprint,
        )
    }
}

/// Terminal state of a file that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Output for the current content already existed, no requests were made
    Skipped { output_path: PathBuf },
    Completed { output_path: PathBuf, entries: usize },
}

impl FileOutcome {
    pub fn output_path(&self) -> &Path {
        match self {
            Self::Skipped { output_path } | Self::Completed { output_path, .. } => output_path,
        }
    }

    pub fn state(&self) -> FileState {
        match self {
            Self::Skipped { .. } => FileState::Skipped,
            Self::Completed { .. } => FileState::Completed,
        }
    }
}

/// A file a directory run could not translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate result of a directory run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files the run started on, including the one interrupted by cancellation
    pub attempted: usize,
    pub completed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FileFailure>,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// Run-wide settings, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub source_language: String,
    pub target_language: String,
    pub concurrency_limit: usize,
    pub retry: RetryPolicy,
    /// `None` writes next to each input file
    pub output_dir: Option<PathBuf>,
    pub file_pattern: String,
    pub recursive: bool,
    pub lock_path: PathBuf,
    pub lock_stale_after: Option<Duration>,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let pipeline = &config.pipeline;
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            concurrency_limit: config.translation.optimal_concurrent_requests().max(1),
            retry: RetryPolicy::from_config(&config.translation.common),
            output_dir: pipeline.output_dir.clone(),
            file_pattern: pipeline.file_pattern.clone(),
            recursive: pipeline.recursive,
            lock_path: pipeline.lock_file.clone(),
            lock_stale_after: pipeline.lock_stale_after_secs.map(Duration::from_secs),
        }
    }
}

/// Pipeline driver bound to one backend and one set of settings
pub struct Orchestrator {
    backend: Arc<dyn TranslationBackend>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn TranslationBackend>, settings: OrchestratorSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn run_lock(&self) -> RunLock {
        RunLock::new(&self.settings.lock_path).with_stale_after(self.settings.lock_stale_after)
    }

    /// Job for one input under the current settings
    pub fn job_for(&self, input_path: &Path) -> JobDescriptor {
        let output_dir = self.settings.output_dir.clone().unwrap_or_else(|| {
            input_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });
        JobDescriptor {
            input_path: input_path.to_path_buf(),
            source_language: self.settings.source_language.clone(),
            target_language: self.settings.target_language.clone(),
            output_dir,
            concurrency_limit: self.settings.concurrency_limit,
        }
    }

    /// Translate one file while holding the run lock
    pub async fn run_file(
        &self,
        input_path: &Path,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, TranslationError> {
        let _guard = self.run_lock().acquire()?;
        let job = self.job_for(input_path);
        self.translate_file(&job, observer, cancel).await
    }

    /// Translate every matching file in `dir` while holding the run lock
    ///
    /// Only lock contention and an unreadable directory fail the whole run.
    /// Per-file failures are collected and the run moves on.
    pub async fn run_directory(
        &self,
        dir: &Path,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary, TranslationError> {
        let _guard = self.run_lock().acquire()?;

        let matcher = OutputNameMatcher::new(&self.settings.source_language, &self.settings.target_language)
            .map_err(|e| TranslationError::io(dir, std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let files: Vec<PathBuf> =
            FileManager::find_files_matching(dir, &self.settings.file_pattern, self.settings.recursive)
                .map_err(|e| TranslationError::io(dir, e))?
                .into_iter()
                .filter(|path| !matcher.is_output(path))
                .collect();

        info!("Found {} subtitle file(s) in {:?}", files.len(), dir);
        let total = files.len();
        let mut summary = BatchSummary::default();
        observer.on_batch_progress(0, total);

        for (done, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.attempted += 1;

            let job = self.job_for(path);
            match self.translate_file(&job, observer, cancel).await {
                Ok(FileOutcome::Completed { output_path, .. }) => summary.completed.push(output_path),
                Ok(FileOutcome::Skipped { output_path }) => summary.skipped.push(output_path),
                Err(TranslationError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("Failed to translate {:?}: {}", path, e);
                    summary.failed.push(FileFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
            observer.on_batch_progress(done + 1, total);
        }

        if summary.cancelled {
            warn!("Directory run cancelled after {} of {} file(s)", summary.attempted, total);
        }
        Ok(summary)
    }

    /// Per-file pipeline without locking
    ///
    /// Any error leaves no output file behind: the translation is written
    /// only once every entry has succeeded, and the write is atomic.
    pub async fn translate_file(
        &self,
        job: &JobDescriptor,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, TranslationError> {
        let path = job.input_path.as_path();
        observer.on_file_state(path, FileState::Pending);
        let result = self.translate_file_inner(job, observer, cancel).await;
        let state = match &result {
            Ok(outcome) => outcome.state(),
            Err(_) => FileState::Failed,
        };
        observer.on_file_state(path, state);
        observer.on_file_finished(path, state);
        result
    }

    async fn translate_file_inner(
        &self,
        job: &JobDescriptor,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, TranslationError> {
        let path = job.input_path.as_path();
        let bytes = FileManager::read_bytes(path).map_err(|e| TranslationError::io(path, e))?;
        let document = SubtitleDocument::parse(&bytes)?;

        let fingerprint = Fingerprint::of_bytes(&bytes);
        let output_path = job.output_path_for(&fingerprint);
        if FileManager::file_exists(&output_path) {
            info!("Skipping {:?}: {:?} is up to date", path, output_path);
            return Ok(FileOutcome::Skipped { output_path });
        }

        let total = document.len();
        observer.on_file_state(path, FileState::Translating);
        observer.on_file_started(path, total);
        observer.on_entry_progress(path, 0, total);
        debug!("Translating {:?} ({} entries, fingerprint {})", path, total, fingerprint.short());

        let translator = BatchTranslator::new(self.backend.as_ref(), self.settings.retry, job.concurrency_limit);
        let translations = translator
            .translate_texts(&document.texts(), &job.target_language, cancel, |completed, total| {
                observer.on_entry_progress(path, completed, total)
            })
            .await?;

        let translated = document.with_translations(translations)?;
        FileManager::write_atomic(&output_path, &translated.to_srt_bytes())
            .map_err(|e| TranslationError::io(&output_path, e))?;

        info!("Translated {:?} -> {:?}", path, output_path);
        Ok(FileOutcome::Completed {
            output_path,
            entries: total,
        })
    }
}
