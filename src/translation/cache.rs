/*!
 * In-run translation cache.
 *
 * Subtitles repeat short lines ("Yes.", "What?") constantly. The cache lets
 * each distinct line of a run reach the provider once per language pair.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;

/// Default capacity, matching `cache_max_entries` in the config
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Cache key combining source text, source language, and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_text: String,
    source_language: String,
    target_language: String,
}

impl CacheKey {
    fn new(source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

/// Cached translation with its last access tick
#[derive(Debug)]
struct CachedTranslation {
    translation: String,
    last_used: AtomicU64,
}

/// Hit and miss counters of a cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 { self.hits as f64 / total as f64 } else { 0.0 }
    }
}

/// Translation cache shared by clones
///
/// Holds at most `max_entries` translations and evicts the least recently
/// used one when full. A limit of 0 leaves the cache unbounded.
#[derive(Debug, Clone)]
pub struct TranslationCache {
    cache: Arc<RwLock<HashMap<CacheKey, CachedTranslation>>>,
    clock: Arc<AtomicU64>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    evictions: Arc<AtomicUsize>,
    max_entries: usize,
    enabled: bool,
}

impl TranslationCache {
    /// Create a new translation cache
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            evictions: Arc::new(AtomicUsize::new(0)),
            max_entries,
            enabled,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Get a translation from the cache
    pub fn get(&self, source_text: &str, source_language: &str, target_language: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(source_text, source_language, target_language);
        let found = self.cache.read().get(&key).map(|entry| {
            entry.last_used.store(self.tick(), Ordering::Relaxed);
            entry.translation.clone()
        });

        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}' ({} -> {})", truncate_text(source_text, 30), source_language, target_language);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        found
    }

    /// Store a translation in the cache
    pub fn store(&self, source_text: &str, source_language: &str, target_language: &str, translation: &str) {
        if !self.enabled {
            return;
        }

        let key = CacheKey::new(source_text, source_language, target_language);
        let entry = CachedTranslation {
            translation: translation.to_string(),
            last_used: AtomicU64::new(self.tick()),
        };

        let mut cache = self.cache.write();
        if self.max_entries > 0 && !cache.contains_key(&key) {
            while cache.len() >= self.max_entries {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, cached)| cached.last_used.load(Ordering::Relaxed))
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(oldest) => {
                        cache.remove(&oldest);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    None => break,
                }
            }
        }
        cache.insert(key, entry);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drop all entries and reset counters
    pub fn clear(&self) {
        self.cache.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_ENTRIES)
    }
}

/// Shorten text for log lines, respecting char boundaries
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
