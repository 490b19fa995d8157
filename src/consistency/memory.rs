/*!
 * Translation memory.
 *
 * Exact-match store keyed by source text. Any unit whose source text was
 * already translated in this project reuses the stored translation without
 * a provider call, which also guarantees identical source strings end up
 * with identical translations.
 */

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

/// Exact-match translation memory, shared across workers
#[derive(Clone)]
pub struct TranslationMemory {
    /// Internal storage: source text -> translation
    entries: Arc<RwLock<HashMap<String, String>>>,

    /// Hit counter
    hits: Arc<RwLock<usize>>,

    /// Miss counter
    misses: Arc<RwLock<usize>>,
}

impl TranslationMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(RwLock::new(0)),
            misses: Arc::new(RwLock::new(0)),
        }
    }

    /// Look up an exact source-text match
    pub fn get(&self, source_text: &str) -> Option<String> {
        let entries = self.entries.read();
        match entries.get(source_text) {
            Some(translation) => {
                *self.hits.write() += 1;
                debug!("TM hit for '{}'", truncate_text(source_text, 30));
                Some(translation.clone())
            }
            None => {
                *self.misses.write() += 1;
                None
            }
        }
    }

    /// Store a translation for a source text
    pub fn store(&self, source_text: &str, translation: &str) {
        if source_text.is_empty() {
            return;
        }
        self.entries
            .write()
            .insert(source_text.to_string(), translation.to_string());
    }

    /// Seed the memory from already-translated units, so a resumed batch
    /// reuses everything translated before the interruption.
    pub fn seed<'a, I>(&self, pairs: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entries = self.entries.write();
        let mut added = 0;
        for (source, translation) in pairs {
            if !source.is_empty() && !translation.is_empty() {
                entries.insert(source.to_string(), translation.to_string());
                added += 1;
            }
        }
        added
    }

    /// Number of stored pairs
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the memory holds no pairs
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hit/miss counters and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = *self.hits.read();
        let misses = *self.misses.read();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }
}

impl Default for TranslationMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncate text for log output
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
