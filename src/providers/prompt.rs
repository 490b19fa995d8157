/*!
 * Prompt rendering for translation requests.
 *
 * One system prompt carries the standing rules (token preservation, tone,
 * pronoun discipline) and the per-game character block; the user prompt
 * carries the glossary slice, recent exchanges, and the text itself.
 */

use crate::language_utils::get_language_name;
use crate::providers::{TranslationMode, TranslationRequest};

/// Render the system prompt for a request
pub fn build_system_prompt(request: &TranslationRequest) -> String {
    let target = get_language_name(&request.target_language);
    let source = get_language_name(&request.source_language);

    let mut prompt = match &request.mode {
        TranslationMode::Polish => format!(
            "You are an expert {target} copy editor for video game text. \
             Improve the grammar, flow, and naturalness of the given {target} text. \
             Keep the meaning, tone, and approximate length. Output only the improved text."
        ),
        _ => format!(
            "You are an expert {source}-to-{target} translator for RPG video games. \
             Translate the given {label} into natural, fluent {target}, \
             keeping the tone and register of the original. Output only the translation, \
             no explanations.",
            label = request.context.category_label,
        ),
    };

    prompt.push_str(
        "\nThe text contains opaque tokens like ⟦0⟧ and ⟦1⟧. They are untranslatable \
         markup. Reproduce every token exactly as written, in the position where its \
         content belongs.",
    );

    if request.intensify {
        prompt.push_str(&format!(
            "\nIMPORTANT: your previous attempt left {source} characters in the output. \
             The output must contain ONLY {target} text and the tokens."
        ));
    }

    if request.mode != TranslationMode::Polish && !request.context.actor_context.is_empty() {
        prompt.push_str("\n\nCharacters in this game (ALWAYS use the listed pronouns):\n");
        prompt.push_str(&request.context.actor_context);
    }

    prompt
}

/// Render the user prompt for a request
pub fn build_user_prompt(request: &TranslationRequest) -> String {
    let mut prompt = String::new();

    if request.mode != TranslationMode::Polish && !request.context.glossary_terms.is_empty() {
        prompt.push_str("Use these established translations:\n");
        for (term, translation) in &request.context.glossary_terms {
            prompt.push_str(&format!("  {term} = {translation}\n"));
        }
        prompt.push('\n');
    }

    if !request.context.history.is_empty() {
        prompt.push_str("Recent dialogue for context:\n");
        for exchange in &request.context.history {
            match &exchange.speaker {
                Some(speaker) => {
                    prompt.push_str(&format!("  {}: {}\n", speaker, exchange.translation))
                }
                None => prompt.push_str(&format!("  {}\n", exchange.translation)),
            }
        }
        prompt.push('\n');
    }

    if let Some(speaker) = &request.context.speaker {
        prompt.push_str(&format!("[Speaker: {speaker}"));
        if let Some(hint) = request.context.speaker_gender.pronoun_hint() {
            prompt.push_str(&format!(" {hint}"));
        }
        prompt.push_str("]\n");
    }

    if let TranslationMode::Correction { previous, hint } = &request.mode {
        prompt.push_str(&format!(
            "The previous translation was rejected.\nPrevious: {previous}\nReviewer note: {hint}\n\n"
        ));
    }

    match request.mode {
        TranslationMode::Polish => prompt.push_str("Text to improve:\n"),
        _ => prompt.push_str("Text to translate:\n"),
    }
    prompt.push_str(&request.text);
    prompt
}
