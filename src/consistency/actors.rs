/*!
 * Actor registry and gender heuristics.
 *
 * Pronoun consistency is the hardest part of JP→EN game translation: Japanese
 * dialogue rarely states a subject, so the model guesses pronouns unless told.
 * The registry keeps per-actor gender assignments (auto-detected from actor
 * metadata, overridable) and renders a character reference block injected
 * into dialogue prompts.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Japanese and English keywords hinting at a female character
static FEMALE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)彼女|お姉|少女|王女|巫女|メイド|おかあ|女|姫|嬢|娘|母|姉|妹|妻|\bactress\b|\bfemale\b|\bgirl\b|\bwoman\b|\bprincess\b|\bqueen\b|\blady\b|\bwitch\b|\bpriestess\b|\bmaid\b",
    )
    .unwrap()
});

/// Japanese and English keywords hinting at a male character
static MALE_HINTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)おとうさん|少年|勇者|騎士|王子|息子|男|父|兄|弟|夫|彼|\bactor\b|\bmale\b|\bboy\b|\bman\b|\bprince\b|\bking\b|\bknight\b|\bhero\b|\blord\b",
    )
    .unwrap()
});

/// Gender assignment for pronoun guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unknown,
}

impl Gender {
    /// Prompt fragment stating which pronouns to use
    pub fn pronoun_hint(&self) -> Option<&'static str> {
        match self {
            Self::Female => Some("[female - use she/her]"),
            Self::Male => Some("[male - use he/him]"),
            Self::Unknown => None,
        }
    }

    /// Sort key for actor-grouped translation: female speakers first,
    /// then male, then ungendered.
    pub fn bucket(&self) -> u8 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
            Self::Unknown => 2,
        }
    }
}

/// One actor from Actors.json, with its gender assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Actor id from the database (1-based)
    pub id: u32,

    /// Source-language name
    pub name: String,

    /// Translated name, once the name pass has run
    #[serde(default)]
    pub translated_name: Option<String>,

    /// Gender assignment (auto-detected, then possibly overridden)
    #[serde(default)]
    pub gender: Gender,
}

impl ActorRecord {
    /// Create a record with gender auto-detected from actor metadata
    pub fn detect(id: u32, name: &str, profile: &str, note: &str, nickname: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            translated_name: None,
            gender: detect_gender(profile, note, nickname),
        }
    }

    /// Best display name: the translation when available
    pub fn display_name(&self) -> &str {
        self.translated_name.as_deref().unwrap_or(&self.name)
    }
}

/// Score actor metadata against the keyword tables. Ties (including
/// zero hits on both sides) stay Unknown.
pub fn detect_gender(profile: &str, note: &str, nickname: &str) -> Gender {
    let all_text = format!("{profile} {note} {nickname}");
    let female_score = FEMALE_HINTS.find_iter(&all_text).count();
    let male_score = MALE_HINTS.find_iter(&all_text).count();

    if female_score > male_score {
        Gender::Female
    } else if male_score > female_score {
        Gender::Male
    } else {
        Gender::Unknown
    }
}

/// Render the character reference block for prompts, e.g.
/// `リリィ (Lily) [female - use she/her]` one line per actor.
/// Actors without names are omitted.
pub fn build_actor_context(actors: &[ActorRecord]) -> String {
    let mut lines = Vec::new();
    for actor in actors {
        if actor.name.is_empty() {
            continue;
        }
        let mut parts = vec![match &actor.translated_name {
            Some(en) if en != &actor.name => format!("{} ({})", actor.name, en),
            _ => actor.name.clone(),
        }];
        if let Some(hint) = actor.gender.pronoun_hint() {
            parts.push(hint.to_string());
        }
        lines.push(parts.join(" "));
    }
    lines.join("\n")
}

/// Look up the gender for a speaker name, matching either the source
/// name or the translated name.
pub fn gender_for_speaker(actors: &[ActorRecord], speaker: &str) -> Gender {
    actors
        .iter()
        .find(|a| a.name == speaker || a.translated_name.as_deref() == Some(speaker))
        .map(|a| a.gender)
        .unwrap_or_default()
}
