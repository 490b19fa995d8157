/*!
 * Two-layer glossary.
 *
 * The general layer is a cross-project term file (genre staples, common
 * honorifics); the project layer is learned per game, mostly from name and
 * database passes. On lookup the layers merge with the project layer
 * winning, so a per-game decision always beats the general default.
 */

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};
use parking_lot::RwLock;

use crate::file_utils::FileManager;

/// Shared two-layer term store
#[derive(Clone, Default)]
pub struct GlossaryStore {
    /// Cross-project defaults, loaded from disk, never written by batches
    general: Arc<RwLock<BTreeMap<String, String>>>,

    /// Per-project learned terms, persisted with the project state
    project: Arc<RwLock<BTreeMap<String, String>>>,
}

impl GlossaryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the general layer from a JSON object file (`{"term": "translation"}`).
    /// A missing file is not an error; the layer just stays empty.
    pub fn load_general(&self, path: &Path) -> Result<usize> {
        if !FileManager::file_exists(path) {
            debug!("No general glossary at {:?}", path);
            return Ok(0);
        }
        let content = FileManager::read_to_string(path)?;
        let terms: BTreeMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse general glossary: {:?}", path))?;
        let count = terms.len();
        *self.general.write() = terms;
        info!("Loaded {} general glossary terms", count);
        Ok(count)
    }

    /// Replace the project layer wholesale (when opening a project)
    pub fn set_project_terms(&self, terms: BTreeMap<String, String>) {
        *self.project.write() = terms;
    }

    /// Snapshot of the project layer, for persisting with the project state
    pub fn project_terms(&self) -> BTreeMap<String, String> {
        self.project.read().clone()
    }

    /// Insert or update a project-layer term
    pub fn upsert(&self, term: &str, translation: &str) {
        if term.is_empty() || translation.is_empty() {
            return;
        }
        self.project
            .write()
            .insert(term.to_string(), translation.to_string());
    }

    /// Merged lookup: project layer wins over general
    pub fn get(&self, term: &str) -> Option<String> {
        if let Some(t) = self.project.read().get(term) {
            return Some(t.clone());
        }
        self.general.read().get(term).cloned()
    }

    /// Terms relevant to a piece of source text: every merged entry whose
    /// term occurs as a substring. This is what gets injected into the
    /// prompt, keeping it short for texts that touch few known terms.
    pub fn relevant_terms(&self, source_text: &str) -> Vec<(String, String)> {
        let mut merged = self.general.read().clone();
        for (k, v) in self.project.read().iter() {
            merged.insert(k.clone(), v.clone());
        }
        merged
            .into_iter()
            .filter(|(term, _)| source_text.contains(term.as_str()))
            .collect()
    }

    /// Total distinct terms across both layers
    pub fn len(&self) -> usize {
        let general = self.general.read();
        let project = self.project.read();
        let extra = general.keys().filter(|k| !project.contains_key(*k)).count();
        project.len() + extra
    }

    /// Whether both layers are empty
    pub fn is_empty(&self) -> bool {
        self.general.read().is_empty() && self.project.read().is_empty()
    }
}
