/*!
 * Per-unit context assembly.
 *
 * Pulls together everything a single provider call needs beyond the text
 * itself: the relevant glossary slice, the character reference block, the
 * speaker's pronoun hint, and the recent dialogue window. Assembly reads
 * snapshots only, so workers can build contexts without holding any lock
 * across an await.
 */

use crate::consistency::{actors, ActorRecord, Gender, GlossaryStore};
use crate::context::history::{Exchange, HistoryWindow};
use crate::project::TranslationUnit;

/// Everything the prompt builder needs for one unit
#[derive(Debug, Clone, Default)]
pub struct TranslationContext {
    /// Glossary entries whose term occurs in the source text
    pub glossary_terms: Vec<(String, String)>,

    /// Character reference block (names, translations, pronoun hints)
    pub actor_context: String,

    /// Speaker of this unit, when known
    pub speaker: Option<String>,

    /// Speaker's gender assignment
    pub speaker_gender: Gender,

    /// Recent translated exchanges, oldest first
    pub history: Vec<Exchange>,

    /// Content category label for the prompt ("dialogue", "item name", ...)
    pub category_label: &'static str,
}

/// Build the context for one unit from the shared stores.
///
/// Non-dialogue categories skip the history window and actor block; a
/// stray dialogue exchange adds nothing to an item description and can
/// steer the model off.
pub fn assemble(
    unit: &TranslationUnit,
    glossary: &GlossaryStore,
    actor_list: &[ActorRecord],
    history: &HistoryWindow,
) -> TranslationContext {
    let dialogue_like = unit.category.is_dialogue_like();

    let speaker = unit.speaker.clone();
    let speaker_gender = speaker
        .as_deref()
        .map(|s| actors::gender_for_speaker(actor_list, s))
        .unwrap_or_default();

    TranslationContext {
        glossary_terms: glossary.relevant_terms(&unit.source_text),
        actor_context: if dialogue_like {
            actors::build_actor_context(actor_list)
        } else {
            String::new()
        },
        speaker,
        speaker_gender,
        history: if dialogue_like {
            history.snapshot()
        } else {
            Vec::new()
        },
        category_label: unit.category.label(),
    }
}
