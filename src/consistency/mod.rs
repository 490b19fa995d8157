/*!
 * Consistency stores shared by the batch engine: glossary, translation
 * memory, and the actor registry with gender heuristics.
 */

pub mod actors;
pub mod glossary;
pub mod memory;

pub use actors::{build_actor_context, detect_gender, gender_for_speaker, ActorRecord, Gender};
pub use glossary::GlossaryStore;
pub use memory::TranslationMemory;
