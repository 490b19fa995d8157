/*!
 * Application controller: wires configuration, extraction, the batch
 * engine, word wrap, and export into the workflows the CLI exposes.
 */

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::backup;
use crate::codec::{self, ApplyStats};
use crate::consistency::GlossaryStore;
use crate::errors::CodecError;
use crate::file_utils::FileManager;
use crate::orchestrator::events::{BatchSummary, ProgressEvent};
use crate::orchestrator::{BatchPass, Orchestrator};
use crate::project::{ProjectState, ProjectStats};
use crate::providers::ollama::Ollama;
use crate::providers::TranslateProvider;
use crate::wordwrap::{self, WrapReport};

/// Project state file, stored at the game project root
pub const STATE_FILE: &str = "_translation_state.json";

/// Main application controller
pub struct Controller {
    config: Config,
}

impl Controller {
    /// Create a controller for tests with the default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    /// Location of the persisted project state for a game folder
    pub fn state_path(project_dir: &Path) -> PathBuf {
        project_dir.join(STATE_FILE)
    }

    fn data_dir(&self, project_dir: &Path) -> Result<PathBuf> {
        FileManager::find_data_dir(project_dir).ok_or_else(|| {
            anyhow!(CodecError::DataDirNotFound(
                project_dir.to_string_lossy().to_string()
            ))
        })
    }

    /// Open a project: extract from the pristine tree (the backup
    /// snapshot once one exists), merge any previously saved
    /// translations by unit identity, and persist the refreshed state.
    pub fn open_project(&self, project_dir: &Path) -> Result<ProjectState> {
        let data_dir = self.data_dir(project_dir)?;
        let source_dir = backup::source_dir_for(&data_dir);
        let engine = FileManager::detect_engine(project_dir);
        let extraction = codec::extract_data_dir(&source_dir, engine)?;

        let mut state = ProjectState::new(project_dir.to_string_lossy(), extraction.units);
        state.game_title = extraction.game_title;
        state.actors = extraction.actors;

        let state_path = Self::state_path(project_dir);
        if FileManager::file_exists(&state_path) {
            let prior = ProjectState::load(&state_path)?;
            let merged = state.merge_previous(&prior);
            info!("Merged {} prior translations into refreshed state", merged);
        }
        state.save(&state_path)?;
        Ok(state)
    }

    /// Run a translation batch over the project
    pub async fn translate(&self, project_dir: &Path, pass: BatchPass) -> Result<BatchSummary> {
        let mut state = self.open_project(project_dir)?;
        let provider = self.build_provider()?;
        provider
            .test_connection()
            .await
            .context("Translation provider is unreachable")?;

        let glossary = self.load_glossary(&state)?;
        let engine = Orchestrator::new(provider, &self.config, glossary.clone());
        let state_path = Self::state_path(project_dir);

        info!(
            "Translating '{}' ({} -> {})",
            if state.game_title.is_empty() { "untitled project" } else { &state.game_title },
            self.config.source_language,
            self.config.target_language
        );

        let progress = Self::progress_bar();
        let bar = progress.clone();
        let checkpoint_path = state_path.clone();
        let summary = engine
            .run_batch(&mut state, pass, move |event| {
                Self::handle_event(&bar, &checkpoint_path, event)
            })
            .await?;
        progress.finish_and_clear();

        state.project_glossary = glossary.project_terms();
        state.save(&state_path)?;
        Self::log_summary(&summary);
        Ok(summary)
    }

    /// Run a polish pass over everything already translated
    pub async fn polish(&self, project_dir: &Path) -> Result<BatchSummary> {
        let state_path = Self::state_path(project_dir);
        let mut state = Self::load_state(&state_path)?;
        let provider = self.build_provider()?;
        provider
            .test_connection()
            .await
            .context("Translation provider is unreachable")?;

        let glossary = self.load_glossary(&state)?;
        let engine = Orchestrator::new(provider, &self.config, glossary);

        let progress = Self::progress_bar();
        let bar = progress.clone();
        let checkpoint_path = state_path.clone();
        let summary = engine
            .run_polish(&mut state, move |event| {
                Self::handle_event(&bar, &checkpoint_path, event)
            })
            .await?;
        progress.finish_and_clear();

        state.save(&state_path)?;
        Self::log_summary(&summary);
        Ok(summary)
    }

    /// Re-flow translated dialogue to the configured message-window width
    pub fn wrap(&self, project_dir: &Path) -> Result<WrapReport> {
        let state_path = Self::state_path(project_dir);
        let mut state = Self::load_state(&state_path)?;
        let report = wordwrap::wrap_project(&mut state, &self.config.wordwrap);
        state.save(&state_path)?;
        info!(
            "Wrapped {} units, {} overflow the line budget",
            report.wrapped,
            report.overflowing.len()
        );
        Ok(report)
    }

    /// Write translations back into the game data tree.
    ///
    /// The first export snapshots the data directory; every export reads
    /// structure from the snapshot, so exporting is repeatable.
    pub fn export(&self, project_dir: &Path, strict: bool) -> Result<ApplyStats> {
        let data_dir = self.data_dir(project_dir)?;
        let state_path = Self::state_path(project_dir);
        let state = Self::load_state(&state_path)?;

        backup::ensure_backup(&data_dir)?;
        let source_dir = backup::source_dir_for(&data_dir);
        let stats = codec::apply_state(&data_dir, &source_dir, &state, strict)?;

        if !stats.missing.is_empty() {
            warn!(
                "{} translated units had no slot in the data tree",
                stats.missing.len()
            );
        }
        info!(
            "Exported {} translations into {} file(s)",
            stats.applied, stats.files_written
        );
        Ok(stats)
    }

    /// Progress counts for the project
    pub fn stats(&self, project_dir: &Path) -> Result<ProjectStats> {
        let state = Self::load_state(&Self::state_path(project_dir))?;
        Ok(state.stats())
    }

    fn load_state(state_path: &Path) -> Result<ProjectState> {
        if !FileManager::file_exists(state_path) {
            return Err(anyhow!(
                "No project state at {:?}; run the extract or translate command first",
                state_path
            ));
        }
        ProjectState::load(state_path)
    }

    fn build_provider(&self) -> Result<Arc<dyn TranslateProvider>> {
        let provider_config = self
            .config
            .translation
            .get_active_provider_config()
            .ok_or_else(|| {
                anyhow!(
                    "No configuration for active provider: {}",
                    self.config.translation.provider
                )
            })?;
        Ok(Arc::new(Ollama::new(provider_config)?))
    }

    fn load_glossary(&self, state: &ProjectState) -> Result<GlossaryStore> {
        let glossary = GlossaryStore::new();
        glossary.load_general(&Config::default_general_glossary_path())?;
        glossary.set_project_terms(state.project_glossary.clone());
        Ok(glossary)
    }

    fn progress_bar() -> ProgressBar {
        let bar = ProgressBar::new(0);
        let template = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(template.progress_chars("█▓▒░"));
        bar
    }

    /// Drive the progress bar and checkpoint persistence from batch events
    fn handle_event(bar: &ProgressBar, state_path: &Path, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => bar.set_length(total as u64),
            ProgressEvent::UnitCompleted { translation, .. } => {
                bar.inc(1);
                bar.set_message(truncate_for_display(&translation, 40));
            }
            ProgressEvent::UnitFailed { id, error } => {
                bar.inc(1);
                warn!("Unit {} failed: {}", id, error);
            }
            ProgressEvent::LeakageAccepted { id } => {
                warn!("Unit {} kept source-language characters", id);
            }
            ProgressEvent::Checkpoint { mut state, completed } => {
                if let Err(e) = state.save(state_path) {
                    warn!("Checkpoint save after {} units failed: {}", completed, e);
                }
            }
            ProgressEvent::Finished(_) => {}
        }
    }

    fn log_summary(summary: &BatchSummary) {
        info!(
            "Batch: {}/{} translated ({} from memory, {} failed, {} with residual source text) in {:?}",
            summary.completed,
            summary.total,
            summary.from_memory,
            summary.failed,
            summary.leakage_accepted,
            summary.elapsed
        );
    }
}

/// Truncate a translation for the progress-bar message
fn truncate_for_display(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        single_line
    } else {
        let truncated: String = single_line.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
