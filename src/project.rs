/*!
 * Project state and translatable units.
 *
 * A project owns the flat ordered list of translatable units extracted from
 * an RPG Maker MV/MZ data tree, the project glossary layer, and the actor
 * registry. The whole state serializes to a single JSON document; saves are
 * atomic (write to a temp file, then rename into place).
 */

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::consistency::actors::ActorRecord;

/// Stable identity of a translatable unit: source file plus field path.
///
/// The field path encodes the structural location (e.g.
/// `Actors/3/profile` or `Ev12/p0/dialog_4`) and stays stable across
/// re-extraction of the same source tree, so prior translations can be
/// merged onto a re-opened project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId {
    /// Source file name, e.g. "Map001.json"
    pub file_id: String,

    /// Structural field path inside the file
    pub field_path: String,
}

impl UnitId {
    /// Create a new unit identity
    pub fn new(file_id: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            field_path: field_path.into(),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_id, self.field_path)
    }
}

/// Content category of a unit, driven by the extraction whitelist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Show Text dialogue block (merged 401 run)
    Dialogue,
    /// Show Choices option
    Choice,
    /// Scroll Text block (merged 405 run)
    ScrollText,
    /// Speaker name from a 101 header or namebox
    SpeakerName,
    /// Database or event actor name
    Name,
    /// Database nickname
    Nickname,
    /// Database profile text
    Profile,
    /// Database description text
    Description,
    /// Database battle/state message
    Message,
    /// System.json term or type-array label
    SystemTerm,
    /// Map display name
    MapName,
    /// Whitelisted plugin command text
    PluginText,
}

impl ContentCategory {
    /// Whether units of this category participate in the dialogue
    /// history window and pronoun context.
    pub fn is_dialogue_like(&self) -> bool {
        matches!(self, Self::Dialogue | Self::ScrollText | Self::Choice)
    }

    /// Whether a successful translation of this category should be
    /// upserted into the project glossary layer (DB/name passes).
    pub fn feeds_glossary(&self) -> bool {
        matches!(self, Self::Name | Self::Nickname | Self::SpeakerName)
    }

    /// Whether word wrapping applies (text shown in the message window)
    pub fn is_wrappable(&self) -> bool {
        matches!(self, Self::Dialogue | Self::ScrollText)
    }

    /// Short label used in prompts and progress output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Choice => "choice",
            Self::ScrollText => "scroll text",
            Self::SpeakerName => "speaker name",
            Self::Name => "name",
            Self::Nickname => "nickname",
            Self::Profile => "profile",
            Self::Description => "description",
            Self::Message => "battle message",
            Self::SystemTerm => "UI term",
            Self::MapName => "map name",
            Self::PluginText => "plugin text",
        }
    }
}

/// Translation status of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    /// Not yet translated
    #[default]
    Untranslated,
    /// Machine-translated, pending review
    Translated,
    /// Reviewed and accepted by an operator
    Reviewed,
    /// Deliberately skipped (non-source-script placeholder, etc.)
    Skipped,
    /// Last batch attempt failed; retried on the next batch run
    Failed,
}

impl UnitStatus {
    /// Whether the unit carries an exportable translation
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Translated | Self::Reviewed)
    }

    /// Whether a batch run should skip this unit
    pub fn is_batch_skipped(&self) -> bool {
        matches!(self, Self::Translated | Self::Reviewed | Self::Skipped)
    }
}

/// One addressable translatable string with its structural location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Stable identity
    pub id: UnitId,

    /// Content category from the extraction whitelist
    pub category: ContentCategory,

    /// Original source-language text (namebox prefix stripped)
    pub source_text: String,

    /// Current translation, if any
    #[serde(default)]
    pub translated_text: Option<String>,

    /// Translation status
    #[serde(default)]
    pub status: UnitStatus,

    /// Document position, for ordering and progress
    pub order_key: usize,

    /// Speaker attribution for dialogue units
    #[serde(default)]
    pub speaker: Option<String>,

    /// Physical segment count of the original (merged 401/405 lines)
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,

    /// Namebox prefix split off the first line (`\N<...>` or `\n[N]`),
    /// re-attached verbatim on write
    #[serde(default)]
    pub namebox: Option<String>,

    /// Full raw command string, for MV plugin command reconstruction
    #[serde(default)]
    pub raw_command: Option<String>,

    /// Error message from the last failed attempt
    #[serde(default)]
    pub last_error: Option<String>,
}

fn default_segment_count() -> usize {
    1
}

impl TranslationUnit {
    /// Create a new untranslated unit
    pub fn new(id: UnitId, category: ContentCategory, source_text: impl Into<String>, order_key: usize) -> Self {
        Self {
            id,
            category,
            source_text: source_text.into(),
            translated_text: None,
            status: UnitStatus::Untranslated,
            order_key,
            speaker: None,
            segment_count: 1,
            namebox: None,
            raw_command: None,
            last_error: None,
        }
    }

    /// Builder: attach a speaker
    pub fn with_speaker(mut self, speaker: Option<String>) -> Self {
        self.speaker = speaker;
        self
    }

    /// Builder: set the original segment count
    pub fn with_segments(mut self, count: usize) -> Self {
        self.segment_count = count.max(1);
        self
    }

    /// Builder: attach a namebox prefix
    pub fn with_namebox(mut self, namebox: Option<String>) -> Self {
        self.namebox = namebox;
        self
    }

    /// Builder: mark as skipped at extraction time
    pub fn skipped(mut self) -> Self {
        self.status = UnitStatus::Skipped;
        self
    }

    /// Record a successful translation
    pub fn set_translated(&mut self, text: String) {
        self.translated_text = Some(text);
        self.status = UnitStatus::Translated;
        self.last_error = None;
    }

    /// Record a failed attempt
    pub fn set_failed(&mut self, error: String) {
        self.status = UnitStatus::Failed;
        self.last_error = Some(error);
    }
}

/// Aggregate progress counts for a project or file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectStats {
    pub total: usize,
    pub translated: usize,
    pub reviewed: usize,
    pub untranslated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Full persisted project state
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectState {
    /// Path of the game project folder
    pub project_path: String,

    /// Raw game title from System.json
    #[serde(default)]
    pub game_title: String,

    /// All translatable units in document order
    pub units: Vec<TranslationUnit>,

    /// Project-layer glossary (overrides the general layer)
    #[serde(default)]
    pub project_glossary: BTreeMap<String, String>,

    /// Actor registry with gender assignments
    #[serde(default)]
    pub actors: Vec<ActorRecord>,

    /// RFC 3339 creation timestamp
    #[serde(default)]
    pub created_at: String,

    /// RFC 3339 last-save timestamp
    #[serde(default)]
    pub updated_at: String,
}

impl ProjectState {
    /// Create a fresh project state from extracted units
    pub fn new(project_path: impl Into<String>, units: Vec<TranslationUnit>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            project_path: project_path.into(),
            game_title: String::new(),
            units,
            project_glossary: BTreeMap::new(),
            actors: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Find a unit by identity
    pub fn unit(&self, id: &UnitId) -> Option<&TranslationUnit> {
        self.units.iter().find(|u| &u.id == id)
    }

    /// Find a unit mutably by identity
    pub fn unit_mut(&mut self, id: &UnitId) -> Option<&mut TranslationUnit> {
        self.units.iter_mut().find(|u| &u.id == id)
    }

    /// Sorted unique file names covered by the project
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.units.iter().map(|u| u.id.file_id.clone()).collect();
        files.sort();
        files.dedup();
        files
    }

    /// Compute aggregate progress counts
    pub fn stats(&self) -> ProjectStats {
        let mut stats = ProjectStats {
            total: self.units.len(),
            ..ProjectStats::default()
        };
        for unit in &self.units {
            match unit.status {
                UnitStatus::Untranslated => stats.untranslated += 1,
                UnitStatus::Translated => stats.translated += 1,
                UnitStatus::Reviewed => stats.reviewed += 1,
                UnitStatus::Skipped => stats.skipped += 1,
                UnitStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Merge translations from a previously saved state onto freshly
    /// re-extracted units, matched by stable identity. Glossary and actor
    /// gender assignments carry over as well.
    pub fn merge_previous(&mut self, prior: &ProjectState) -> usize {
        let mut merged = 0;
        for unit in &mut self.units {
            if let Some(old) = prior.units.iter().find(|u| u.id == unit.id) {
                if old.status.is_done() && old.translated_text.is_some() {
                    unit.translated_text = old.translated_text.clone();
                    unit.status = old.status;
                    merged += 1;
                }
            }
        }
        for (term, translation) in &prior.project_glossary {
            self.project_glossary
                .entry(term.clone())
                .or_insert_with(|| translation.clone());
        }
        for actor in &mut self.actors {
            if let Some(old) = prior.actors.iter().find(|a| a.id == actor.id) {
                actor.gender = old.gender;
            }
        }
        merged
    }

    /// Save the state to a JSON file. The write is atomic from the
    /// reader's perspective: serialized into a temp file in the target
    /// directory, then renamed over the destination.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = chrono::Utc::now().to_rfc3339();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize project state")?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {:?}", dir))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary state file")?;
        std::io::Write::write_all(&mut tmp, json.as_bytes())
            .context("Failed to write project state")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to persist project state to {:?}", path))?;
        Ok(())
    }

    /// Load a previously saved state
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project state: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse project state: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unit(file: &str, path: &str, text: &str, order: usize) -> TranslationUnit {
        TranslationUnit::new(UnitId::new(file, path), ContentCategory::Dialogue, text, order)
    }

    #[test]
    fn test_unitId_display_shouldJoinFileAndPath() {
        let id = UnitId::new("Map001.json", "Ev3/p0/dialog_1");
        assert_eq!(id.to_string(), "Map001.json/Ev3/p0/dialog_1");
    }

    #[test]
    fn test_unitStatus_isBatchSkipped_shouldSkipDoneAndSkipped() {
        assert!(UnitStatus::Translated.is_batch_skipped());
        assert!(UnitStatus::Reviewed.is_batch_skipped());
        assert!(UnitStatus::Skipped.is_batch_skipped());
        assert!(!UnitStatus::Untranslated.is_batch_skipped());
        assert!(!UnitStatus::Failed.is_batch_skipped());
    }

    #[test]
    fn test_projectState_stats_shouldCountByStatus() {
        let mut units = vec![
            sample_unit("A.json", "1", "a", 0),
            sample_unit("A.json", "2", "b", 1),
            sample_unit("B.json", "1", "c", 2),
        ];
        units[0].set_translated("x".to_string());
        units[2].status = UnitStatus::Skipped;

        let state = ProjectState::new("/game", units);
        let stats = state.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.untranslated, 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_projectState_mergePrevious_shouldCarryTranslationsByIdentity() {
        let mut old_units = vec![sample_unit("A.json", "1", "こんにちは", 0)];
        old_units[0].set_translated("Hello".to_string());
        let prior = ProjectState::new("/game", old_units);

        let fresh_units = vec![
            sample_unit("A.json", "1", "こんにちは", 0),
            sample_unit("A.json", "2", "さようなら", 1),
        ];
        let mut state = ProjectState::new("/game", fresh_units);
        let merged = state.merge_previous(&prior);

        assert_eq!(merged, 1);
        assert_eq!(state.units[0].translated_text.as_deref(), Some("Hello"));
        assert_eq!(state.units[0].status, UnitStatus::Translated);
        assert_eq!(state.units[1].status, UnitStatus::Untranslated);
    }

    #[test]
    fn test_projectState_saveLoad_shouldRoundTrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_translation_state.json");

        let mut units = vec![sample_unit("A.json", "1", "おはよう", 0)];
        units[0].set_translated("Good morning".to_string());
        let mut state = ProjectState::new("/game", units);
        state.project_glossary.insert("夢魔".to_string(), "Succubus".to_string());
        state.save(&path).unwrap();

        let loaded = ProjectState::load(&path).unwrap();
        assert_eq!(loaded.units.len(), 1);
        assert_eq!(loaded.units[0].translated_text.as_deref(), Some("Good morning"));
        assert_eq!(loaded.project_glossary.get("夢魔").unwrap(), "Succubus");
    }
}
