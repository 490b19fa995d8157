/*!
 * # gamemtl
 *
 * A Rust library for batch machine translation of RPG Maker MV/MZ game
 * projects using local LLMs.
 *
 * ## Features
 *
 * - Extract translatable text from RPG Maker data files (dialogue,
 *   choices, database entries, UI terms, whitelisted plugin commands)
 * - Mask engine control sequences so they survive translation verbatim
 * - Translate concurrently through Ollama with glossary, pronoun, and
 *   translation-memory consistency
 * - Re-flow translated dialogue to the message-window width
 * - Write translations back into the game data tree, with a pristine
 *   backup snapshot for repeatable exports
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `project`: Project state and translatable units
 * - `codec`: Data-tree extraction and write-back:
 *   - `codec::extract`: JSON tree -> ordered unit list
 *   - `codec::write`: translated units -> JSON tree
 *   - `codec::commands`: event codes and whitelists
 * - `placeholder`: Control-sequence masking
 * - `consistency`: Glossary, translation memory, actor genders
 * - `context`: Per-unit prompt context assembly and dialogue history
 * - `orchestrator`: Concurrent batch engine and progress events
 * - `providers`: LLM backends (`providers::ollama`, plus a mock)
 * - `wordwrap`: Message-window line re-flow
 * - `backup`: Snapshot of the original data directory
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `language_utils`: Language codes and source-script detection
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod backup;
pub mod codec;
pub mod consistency;
pub mod context;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod orchestrator;
pub mod placeholder;
pub mod project;
pub mod providers;
pub mod wordwrap;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, CodecError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, has_japanese, language_codes_match};
pub use orchestrator::{BatchPass, Orchestrator};
pub use project::{ProjectState, TranslationUnit, UnitId};
