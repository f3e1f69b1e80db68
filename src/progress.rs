/*!
 * Progress reporting interface.
 *
 * The pipeline never renders anything itself. Callers pass an observer into
 * each run; the terminal renderer lives in `app_controller`.
 */

use std::path::{Path, PathBuf};

/// Lifecycle of one input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    /// Output for the current content already existed
    Skipped,
    Translating,
    Completed,
    Failed,
}

/// Receives progress ticks from a run
///
/// Every file reports `Pending` first. A file with an up-to-date output then
/// goes straight to `Skipped`; any other goes to `Translating` and ends in
/// `Completed` or `Failed`. `on_file_state` sees each of these transitions,
/// `on_file_finished` only the last one. Entry counts are monotonic per
/// file. All methods default to doing nothing.
pub trait ProgressObserver: Send + Sync {
    fn on_file_state(&self, _path: &Path, _state: FileState) {}

    fn on_file_started(&self, _path: &Path, _total_entries: usize) {}

    fn on_entry_progress(&self, _path: &Path, _completed: usize, _total: usize) {}

    fn on_file_finished(&self, _path: &Path, _state: FileState) {}

    fn on_batch_progress(&self, _files_done: usize, _files_total: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// One progress tick, owned so it can be sent or stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    FileState { path: PathBuf, state: FileState },
    FileStarted { path: PathBuf, total_entries: usize },
    Entry { path: PathBuf, completed: usize, total: usize },
    FileFinished { path: PathBuf, state: FileState },
    Batch { files_done: usize, files_total: usize },
}

/// Adapts a closure into an observer
pub struct ProgressFn<F>(pub F);

impl<F> ProgressObserver for ProgressFn<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_file_state(&self, path: &Path, state: FileState) {
        (self.0)(ProgressEvent::FileState {
            path: path.to_path_buf(),
            state,
        });
    }

    fn on_file_started(&self, path: &Path, total_entries: usize) {
        (self.0)(ProgressEvent::FileStarted {
            path: path.to_path_buf(),
            total_entries,
        });
    }

    fn on_entry_progress(&self, path: &Path, completed: usize, total: usize) {
        (self.0)(ProgressEvent::Entry {
            path: path.to_path_buf(),
            completed,
            total,
        });
    }

    fn on_file_finished(&self, path: &Path, state: FileState) {
        (self.0)(ProgressEvent::FileFinished {
            path: path.to_path_buf(),
            state,
        });
    }

    fn on_batch_progress(&self, files_done: usize, files_total: usize) {
        (self.0)(ProgressEvent::Batch { files_done, files_total });
    }
}
