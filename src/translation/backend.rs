/*!
 * Translation backend capability.
 *
 * The orchestrator only ever sees this trait. Concrete providers are chosen
 * once from configuration (see `TranslationService`), and tests plug in the
 * mock provider directly.
 */

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::errors::BackendError;

/// A service that can translate single subtitle texts
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate one text into `target_language`
    ///
    /// Line breaks inside `text` must survive in the result. A failure is
    /// atomic: no partial translation is ever returned.
    async fn translate_one(&self, text: &str, target_language: &str) -> Result<String, BackendError>;

    /// Translate several texts; results are in input order
    ///
    /// The default maps `translate_one` over every text concurrently and
    /// fails with the first error. Providers with a multi-item protocol
    /// may override it with a single request.
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>, BackendError> {
        try_join_all(texts.iter().map(|text| self.translate_one(text, target_language))).await
    }

    /// Short name used in logs
    fn name(&self) -> &str;
}
