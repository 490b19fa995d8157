/*!
 * Provider implementations for the translate capability.
 *
 * This module defines the request shape shared by all backends and the
 * trait the batch engine drives. The only networked backend is Ollama
 * (local LLM server); the mock provider covers tests.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::context::TranslationContext;
use crate::errors::ProviderError;

pub mod mock;
pub mod ollama;
pub mod prompt;

/// What kind of rewrite is being requested
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TranslationMode {
    /// Source language to target language
    #[default]
    Standard,
    /// Target-language grammar and flow refinement of an existing
    /// translation; glossary and pronoun context are not injected
    Polish,
    /// Re-translation guided by an operator note about what was wrong
    Correction {
        /// The rejected previous translation
        previous: String,
        /// Operator guidance
        hint: String,
    },
}

/// One translation call, fully assembled by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    /// Text to translate, control sequences already masked
    pub text: String,

    /// Source language code
    pub source_language: String,

    /// Target language code
    pub target_language: String,

    /// Content kind, consistency and history context
    pub context: TranslationContext,

    /// Rewrite mode
    pub mode: TranslationMode,

    /// Sampling temperature override (variant generation)
    pub temperature: Option<f32>,

    /// Set on the retry after residual source script was detected;
    /// strengthens the no-source-script instruction
    pub intensify: bool,
}

impl TranslationRequest {
    /// Standard request for a piece of text
    pub fn new(text: impl Into<String>, source: &str, target: &str) -> Self {
        Self {
            text: text.into(),
            source_language: source.to_string(),
            target_language: target.to_string(),
            ..Self::default()
        }
    }
}

/// Common trait for all translation backends
#[async_trait]
pub trait TranslateProvider: Send + Sync + Debug {
    /// Translate one request, returning the raw translated text
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &str;
}
