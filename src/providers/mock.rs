/*!
 * Mock provider implementations for testing.
 *
 * The behaviors cover the paths the batch engine has to survive: clean
 * responses, dropped mask tokens, residual source script, hard failures,
 * and slow backends for cancellation tests.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{TranslateProvider, TranslationRequest};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Echo the masked text wrapped in a marker, tokens preserved
    Echo,
    /// Answer from a scripted source-text -> translation table,
    /// falling back to Echo for unknown text
    Scripted,
    /// Always fails with a request error
    Failing,
    /// Returns translations that still contain Japanese characters for
    /// the first N calls per text, then clean ones
    Leaky { clean_after: usize },
    /// Drops every mask token from the response
    DroppingTokens,
    /// Sleeps before answering (cancellation and timeout tests)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Total number of translate calls
    call_count: Arc<AtomicUsize>,
    /// Scripted responses by source text
    script: Mutex<HashMap<String, String>>,
    /// Per-text call counters, for Leaky
    per_text_calls: Mutex<HashMap<String, usize>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            script: Mutex::new(HashMap::new()),
            per_text_calls: Mutex::new(HashMap::new()),
        }
    }

    /// Echoing mock that always succeeds
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Mock that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Scripted mock with a source -> translation table
    pub fn scripted(pairs: &[(&str, &str)]) -> Self {
        let mock = Self::new(MockBehavior::Scripted);
        {
            let mut script = mock.script.lock();
            for (source, translation) in pairs {
                script.insert(source.to_string(), translation.to_string());
            }
        }
        mock
    }

    /// Mock that leaks source script for the first `clean_after` calls per text
    pub fn leaky(clean_after: usize) -> Self {
        Self::new(MockBehavior::Leaky { clean_after })
    }

    /// Mock that drops every mask token
    pub fn dropping_tokens() -> Self {
        Self::new(MockBehavior::DroppingTokens)
    }

    /// Mock that delays each response
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of translate calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Shared handle to the call counter
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    fn echo_translation(text: &str) -> String {
        format!("[EN] {text}")
    }
}

#[async_trait]
impl TranslateProvider for MockProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Echo => Ok(Self::echo_translation(&request.text)),
            MockBehavior::Scripted => {
                let script = self.script.lock();
                Ok(script
                    .get(&request.text)
                    .cloned()
                    .unwrap_or_else(|| Self::echo_translation(&request.text)))
            }
            MockBehavior::Failing => {
                Err(ProviderError::RequestFailed("mock failure".to_string()))
            }
            MockBehavior::Leaky { clean_after } => {
                let mut calls = self.per_text_calls.lock();
                let seen = calls.entry(request.text.clone()).or_insert(0);
                *seen += 1;
                if *seen <= *clean_after {
                    Ok(format!("Still 日本語 here: {}", request.text))
                } else {
                    Ok(Self::echo_translation(&request.text))
                }
            }
            MockBehavior::DroppingTokens => {
                let stripped: String = request
                    .text
                    .chars()
                    .filter(|c| !matches!(c, '⟦' | '⟧' | '0'..='9'))
                    .collect();
                Ok(Self::echo_translation(stripped.trim()))
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::echo_translation(&request.text))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => {
                Err(ProviderError::ConnectionError("mock is down".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
