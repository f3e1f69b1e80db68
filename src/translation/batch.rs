/*!
 * Concurrent translation of a document's entries.
 *
 * Every entry is one request. At most `concurrency_limit` requests run at
 * once, each retried under the configured policy, and each result is
 * written into the slot of its entry so completion order never matters.
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::backend::TranslationBackend;
use super::retry::{RetryFailure, RetryPolicy};
use crate::errors::{BackendError, TranslationError};

/// Batch translator for the entries of one file
pub struct BatchTranslator<'a> {
    backend: &'a dyn TranslationBackend,
    retry: RetryPolicy,
    concurrency_limit: usize,
}

impl<'a> BatchTranslator<'a> {
    pub fn new(backend: &'a dyn TranslationBackend, retry: RetryPolicy, concurrency_limit: usize) -> Self {
        Self {
            backend,
            retry,
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// Translate `texts` into `target_language`, results in input order
    ///
    /// Blank texts are passed through without a request. `on_progress`
    /// receives `(completed, total)` after every finished entry. A
    /// non-retryable failure, or retries running out, fails the whole batch
    /// at once and drops requests still in flight. On cancellation no new
    /// request starts, running ones are allowed to finish, and the call
    /// returns `Cancelled`.
    pub async fn translate_texts<P>(
        &self,
        texts: &[String],
        target_language: &str,
        cancel: &CancellationToken,
        mut on_progress: P,
    ) -> Result<Vec<String>, TranslationError>
    where
        P: FnMut(usize, usize),
    {
        let total = texts.len();
        let mut slots: Vec<Option<String>> = vec![None; total];
        let mut pending = Vec::with_capacity(total);

        for (index, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                slots[index] = Some(text.clone());
            } else {
                pending.push(index);
            }
        }

        let mut completed = total - pending.len();
        if completed > 0 {
            on_progress(completed, total);
        }
        debug!(
            "Translating {} entries with {} (limit {}, {} blank)",
            pending.len(),
            self.backend.name(),
            self.concurrency_limit,
            completed
        );

        let backend = self.backend;
        let retry = self.retry;
        let mut results = stream::iter(pending)
            .map(|index| {
                let text = texts[index].as_str();
                async move {
                    let label = format!("Entry {}", index + 1);
                    let result = retry
                        .run(cancel, &label, move || backend.translate_one(text, target_language))
                        .await;
                    (index, result)
                }
            })
            .buffer_unordered(self.concurrency_limit);

        let mut cancelled = false;
        while let Some((index, result)) = results.next().await {
            match result {
                Ok(translated) => {
                    slots[index] = Some(translated);
                    completed += 1;
                    on_progress(completed, total);
                }
                // Keep draining so requests already sent can finish
                Err(RetryFailure::Cancelled) => cancelled = true,
                Err(RetryFailure::Exhausted { attempts, error }) => {
                    warn!("Entry {} failed after {} attempt(s): {}", index + 1, attempts, error);
                    return Err(TranslationError::Backend {
                        entry: index + 1,
                        attempts,
                        source: error,
                    });
                }
            }
        }

        if cancelled {
            return Err(TranslationError::Cancelled);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| TranslationError::Backend {
                    entry: index + 1,
                    attempts: 0,
                    source: BackendError::unknown("entry produced no result"),
                })
            })
            .collect()
    }
}
