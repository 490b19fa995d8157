/*!
 * Context building for translation prompts: the rolling dialogue history
 * window and the per-unit context assembler.
 */

pub mod assembler;
pub mod history;

pub use assembler::{assemble, TranslationContext};
pub use history::{Exchange, HistoryWindow};
