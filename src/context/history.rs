/*!
 * Rolling dialogue history.
 *
 * The last few translated exchanges are replayed into each dialogue prompt
 * so the model keeps tone, topic, and pronouns coherent across a scene.
 * The window is bounded; old exchanges fall off the front.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

/// One translated exchange kept for context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Speaker attribution, when known
    pub speaker: Option<String>,

    /// Source-language text (masked form, as sent to the provider)
    pub source: String,

    /// Translated text
    pub translation: String,
}

/// Shared bounded history window
#[derive(Clone)]
pub struct HistoryWindow {
    entries: Arc<RwLock<VecDeque<Exchange>>>,
    capacity: usize,
}

impl HistoryWindow {
    /// Create a window holding at most `capacity` exchanges
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Record a completed exchange, evicting the oldest past capacity
    pub fn push(&self, exchange: Exchange) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(exchange);
    }

    /// Snapshot of the current window, oldest first
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.entries.read().iter().cloned().collect()
    }

    /// Drop all recorded exchanges (scene boundary, new batch pass)
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Current number of exchanges held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
