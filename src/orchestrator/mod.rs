/*!
 * Concurrent batch translation engine.
 *
 * The engine owns the shared consistency stores (translation memory,
 * glossary, dialogue history) and fans unit groups out to a bounded pool
 * of provider calls. All project-state mutation happens on the caller's
 * task as results stream back in, so workers never contend on the state.
 *
 * Exact-duplicate sources are grouped before dispatch: one provider call
 * translates the leader and the result is applied to every member, which
 * both saves calls and keeps repeated lines identical.
 */

pub mod events;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::app_config::Config;
use crate::consistency::{actors, ActorRecord, GlossaryStore, TranslationMemory};
use crate::context::{self, Exchange, HistoryWindow};
use crate::errors::TranslationError;
use crate::language_utils::has_source_leakage;
use crate::placeholder::{mask, unmask};
use crate::project::{ContentCategory, ProjectState, TranslationUnit, UnitId, UnitStatus};
use crate::providers::{TranslateProvider, TranslationMode, TranslationRequest};

use self::events::{BatchSummary, EtaTracker, ProgressEvent};

/// Sampling temperatures used for alternative-translation generation
pub const VARIANT_TEMPERATURES: [f32; 3] = [0.2, 0.5, 0.8];

/// Which slice of the project a batch run covers.
///
/// Names run first so the glossary and actor registry learn translated
/// names before dialogue references them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPass {
    /// Actor names, nicknames, and speaker names
    Names,
    /// Database text: profiles, descriptions, battle messages, UI terms,
    /// map display names
    Database,
    /// Event text: dialogue, choices, scroll text, plugin text
    Dialogue,
    /// Everything untranslated
    #[default]
    Full,
}

impl BatchPass {
    fn includes(&self, category: ContentCategory) -> bool {
        match self {
            Self::Full => true,
            Self::Names => category.feeds_glossary(),
            Self::Database => matches!(
                category,
                ContentCategory::Profile
                    | ContentCategory::Description
                    | ContentCategory::Message
                    | ContentCategory::SystemTerm
                    | ContentCategory::MapName
            ),
            Self::Dialogue => matches!(
                category,
                ContentCategory::Dialogue
                    | ContentCategory::Choice
                    | ContentCategory::ScrollText
                    | ContentCategory::PluginText
            ),
        }
    }
}

/// How a batch queue is ordered before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrdering {
    /// Document position only
    Document,
    /// Dialogue grouped by speaker gender (female, male, unknown) so one
    /// character's lines translate together, everything else after, each
    /// group in document position
    ActorGrouped,
}

impl JobOrdering {
    /// Default ordering for a pass: dialogue passes group by speaker,
    /// whole-project and database passes keep document order.
    pub fn for_pass(pass: BatchPass) -> Self {
        match pass {
            BatchPass::Dialogue => Self::ActorGrouped,
            _ => Self::Document,
        }
    }
}

/// One dispatched provider job: a leader unit plus every queued unit
/// sharing the same text.
#[derive(Debug, Clone)]
struct TranslationJob {
    /// Snapshot of the leader unit, for context assembly
    unit: TranslationUnit,
    /// All units the result applies to, leader included
    member_ids: Vec<UnitId>,
    /// Text sent to the provider (source text, or the prior translation
    /// in polish mode)
    text: String,
}

/// Outcome of one job's pipeline
#[derive(Debug, Clone)]
enum JobResult {
    Done {
        translation: String,
        from_memory: bool,
        provider_calls: usize,
        leaked: bool,
    },
    Failed {
        error: String,
        provider_calls: usize,
    },
    Cancelled,
}

/// Batch translation engine over one provider
pub struct Orchestrator {
    provider: Arc<dyn TranslateProvider>,
    source_language: String,
    target_language: String,
    workers: usize,
    checkpoint_interval: usize,
    history: HistoryWindow,
    glossary: GlossaryStore,
    memory: TranslationMemory,
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    in_flight: Arc<Mutex<HashSet<UnitId>>>,
}

/// Clears the running flag when a batch exits by any path
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    /// Create an engine over a provider, sharing the given glossary store
    pub fn new(provider: Arc<dyn TranslateProvider>, config: &Config, glossary: GlossaryStore) -> Self {
        Self {
            provider,
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            workers: config.batch.workers.max(1),
            checkpoint_interval: config.batch.checkpoint_interval.max(1),
            history: HistoryWindow::new(config.batch.history_window),
            glossary,
            memory: TranslationMemory::new(),
            running: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Shared translation memory
    pub fn memory(&self) -> &TranslationMemory {
        &self.memory
    }

    /// Request cancellation of the running batch. In-flight provider
    /// calls finish and are applied; queued jobs are abandoned.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether a batch is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run a translation batch over every queued unit the pass covers.
    ///
    /// Progress, failures, and checkpoints are reported through
    /// `on_event`; the checkpoint event carries a full state snapshot so
    /// the caller can persist without touching the borrowed state.
    pub async fn run_batch(
        &self,
        state: &mut ProjectState,
        pass: BatchPass,
        on_event: impl Fn(ProgressEvent),
    ) -> Result<BatchSummary, TranslationError> {
        self.run_batch_ordered(state, pass, JobOrdering::for_pass(pass), on_event)
            .await
    }

    /// Run a batch with an explicit queue ordering instead of the pass
    /// default.
    pub async fn run_batch_ordered(
        &self,
        state: &mut ProjectState,
        pass: BatchPass,
        ordering: JobOrdering,
        on_event: impl Fn(ProgressEvent),
    ) -> Result<BatchSummary, TranslationError> {
        // Resume support: everything already translated feeds the memory
        let seeded = self.memory.seed(state.units.iter().filter_map(|u| {
            match (&u.translated_text, u.status.is_done()) {
                (Some(t), true) => Some((u.source_text.as_str(), t.as_str())),
                _ => None,
            }
        }));
        if seeded > 0 {
            debug!("Seeded translation memory with {} prior pairs", seeded);
        }
        sync_actor_names(state);

        let jobs = build_jobs(state, pass, ordering);
        self.execute(state, jobs, TranslationMode::Standard, true, on_event)
            .await
    }

    /// Run a polish pass: re-send existing translations to the provider
    /// in polish mode and replace them with the improved text.
    pub async fn run_polish(
        &self,
        state: &mut ProjectState,
        on_event: impl Fn(ProgressEvent),
    ) -> Result<BatchSummary, TranslationError> {
        let mut jobs: Vec<TranslationJob> = Vec::new();
        let mut by_text: HashMap<String, usize> = HashMap::new();
        for unit in &state.units {
            if !unit.status.is_done() {
                continue;
            }
            let Some(text) = unit.translated_text.clone() else {
                continue;
            };
            match by_text.get(&text) {
                Some(&index) => jobs[index].member_ids.push(unit.id.clone()),
                None => {
                    by_text.insert(text.clone(), jobs.len());
                    jobs.push(TranslationJob {
                        unit: unit.clone(),
                        member_ids: vec![unit.id.clone()],
                        text,
                    });
                }
            }
        }
        self.execute(state, jobs, TranslationMode::Polish, false, on_event)
            .await
    }

    /// Translate or re-translate one unit outside a batch.
    ///
    /// `mode` selects standard translation, polish of the existing
    /// translation, or a correction guided by an operator note.
    pub async fn translate_unit(
        &self,
        state: &mut ProjectState,
        id: &UnitId,
        mode: TranslationMode,
    ) -> Result<String, TranslationError> {
        if self.in_flight.lock().contains(id) {
            return Err(TranslationError::UnitInFlight(id.clone()));
        }
        let unit = state
            .unit(id)
            .cloned()
            .ok_or_else(|| TranslationError::UnitNotFound(id.clone()))?;

        let text = match &mode {
            TranslationMode::Polish => unit
                .translated_text
                .clone()
                .ok_or_else(|| TranslationError::UnitNotFound(id.clone()))?,
            _ => unit.source_text.clone(),
        };
        let job = TranslationJob {
            unit: unit.clone(),
            member_ids: vec![id.clone()],
            text,
        };

        let actors: Arc<Vec<ActorRecord>> = Arc::new(state.actors.clone());
        let result = self.run_job(&job, &actors, &mode, false).await;
        match result {
            JobResult::Done { translation, .. } => {
                if let Some(target) = state.unit_mut(id) {
                    target.set_translated(translation.clone());
                    if target.category.feeds_glossary() {
                        self.glossary.upsert(&target.source_text, &translation);
                    }
                }
                if mode == TranslationMode::Standard {
                    self.memory.store(&unit.source_text, &translation);
                }
                Ok(translation)
            }
            JobResult::Failed { error, .. } => {
                if let Some(target) = state.unit_mut(id) {
                    target.set_failed(error.clone());
                }
                Err(TranslationError::Provider(
                    crate::errors::ProviderError::RequestFailed(error),
                ))
            }
            JobResult::Cancelled => Err(TranslationError::UnitNotFound(id.clone())),
        }
    }

    /// Generate alternative translations of one unit at a spread of
    /// sampling temperatures. Nothing is written to the project state,
    /// the memory, or the glossary; the operator picks.
    pub async fn generate_variants(
        &self,
        state: &ProjectState,
        id: &UnitId,
    ) -> Result<Vec<String>, TranslationError> {
        if self.in_flight.lock().contains(id) {
            return Err(TranslationError::UnitInFlight(id.clone()));
        }
        let unit = state
            .unit(id)
            .cloned()
            .ok_or_else(|| TranslationError::UnitNotFound(id.clone()))?;
        let actors = state.actors.clone();

        let (masked, map) = mask(&unit.source_text);
        let ctx = context::assemble(&unit, &self.glossary, &actors, &self.history);

        let mut variants = Vec::with_capacity(VARIANT_TEMPERATURES.len());
        for temperature in VARIANT_TEMPERATURES {
            let mut request =
                TranslationRequest::new(masked.clone(), &self.source_language, &self.target_language);
            request.context = ctx.clone();
            request.temperature = Some(temperature);
            let raw = self.provider.translate(&request).await?;
            variants.push(unmask(&raw, &map).text);
        }
        Ok(variants)
    }

    /// Drive a job list to completion, applying results as they arrive
    async fn execute(
        &self,
        state: &mut ProjectState,
        jobs: Vec<TranslationJob>,
        mode: TranslationMode,
        use_memory: bool,
        on_event: impl Fn(ProgressEvent),
    ) -> Result<BatchSummary, TranslationError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TranslationError::BatchAlreadyRunning);
        }
        let _guard = RunGuard(Arc::clone(&self.running));
        self.cancel.store(false, Ordering::SeqCst);

        let total: usize = jobs.iter().map(|j| j.member_ids.len()).sum();
        {
            let mut in_flight = self.in_flight.lock();
            for job in &jobs {
                in_flight.extend(job.member_ids.iter().cloned());
            }
        }
        info!(
            "Batch started: {} units in {} jobs, {} workers",
            total,
            jobs.len(),
            self.workers
        );
        on_event(ProgressEvent::Started { total });

        let started = Instant::now();
        let mut tracker = EtaTracker::new(total);
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };

        let actors: Arc<Vec<ActorRecord>> = Arc::new(state.actors.clone());
        let mut results = stream::iter(jobs.into_iter())
            .map(|job| {
                let actors = Arc::clone(&actors);
                let mode = mode.clone();
                async move {
                    let job_started = Instant::now();
                    let result = self.run_job(&job, &actors, &mode, use_memory).await;
                    let latency_ms = job_started.elapsed().as_millis() as u64;
                    (job, result, latency_ms)
                }
            })
            .buffer_unordered(self.workers);

        while let Some((job, result, latency_ms)) = results.next().await {
            {
                let mut in_flight = self.in_flight.lock();
                for id in &job.member_ids {
                    in_flight.remove(id);
                }
            }
            match result {
                JobResult::Cancelled => {}
                JobResult::Failed { error, provider_calls } => {
                    summary.provider_calls += provider_calls;
                    for id in &job.member_ids {
                        if let Some(unit) = state.unit_mut(id) {
                            unit.set_failed(error.clone());
                        }
                        summary.failed += 1;
                        on_event(ProgressEvent::UnitFailed {
                            id: id.clone(),
                            error: error.clone(),
                        });
                    }
                }
                JobResult::Done {
                    translation,
                    from_memory,
                    provider_calls,
                    leaked,
                } => {
                    summary.provider_calls += provider_calls;
                    if use_memory && !from_memory {
                        self.memory.store(&job.unit.source_text, &translation);
                    }
                    for id in &job.member_ids {
                        let Some(unit) = state.unit_mut(id) else {
                            continue;
                        };
                        unit.set_translated(translation.clone());
                        let category = unit.category;
                        let speaker = unit.speaker.clone();
                        let source = unit.source_text.clone();

                        if category.feeds_glossary() {
                            self.glossary.upsert(&source, &translation);
                            for actor in &mut state.actors {
                                if actor.name == source {
                                    actor.translated_name = Some(translation.clone());
                                }
                            }
                        }
                        if category.is_dialogue_like() {
                            self.history.push(Exchange {
                                speaker,
                                source,
                                translation: translation.clone(),
                            });
                        }

                        summary.completed += 1;
                        if from_memory {
                            summary.from_memory += 1;
                        }
                        if leaked {
                            summary.leakage_accepted += 1;
                            on_event(ProgressEvent::LeakageAccepted { id: id.clone() });
                        }
                        tracker.record();
                        on_event(ProgressEvent::UnitCompleted {
                            id: id.clone(),
                            translation: translation.clone(),
                            latency_ms,
                            from_memory,
                            eta: tracker.eta(),
                        });
                        if summary.completed % self.checkpoint_interval == 0 {
                            on_event(ProgressEvent::Checkpoint {
                                completed: summary.completed,
                                state: state.clone(),
                            });
                        }
                    }
                }
            }
        }
        drop(results);
        self.in_flight.lock().clear();

        summary.elapsed = started.elapsed();
        info!(
            "Batch finished: {}/{} completed, {} failed, {} from memory, {} provider calls in {:?}",
            summary.completed,
            summary.total,
            summary.failed,
            summary.from_memory,
            summary.provider_calls,
            summary.elapsed
        );
        on_event(ProgressEvent::Finished(summary.clone()));
        Ok(summary)
    }

    /// Per-job pipeline: memory lookup, masking, context assembly, the
    /// provider call, unmasking, and the bounded leakage retry.
    async fn run_job(
        &self,
        job: &TranslationJob,
        actors: &[ActorRecord],
        mode: &TranslationMode,
        use_memory: bool,
    ) -> JobResult {
        if self.cancel.load(Ordering::SeqCst) {
            return JobResult::Cancelled;
        }
        if use_memory {
            if let Some(hit) = self.memory.get(&job.unit.source_text) {
                return JobResult::Done {
                    translation: hit,
                    from_memory: true,
                    provider_calls: 0,
                    leaked: false,
                };
            }
        }

        let (masked, map) = mask(&job.text);
        let mut request =
            TranslationRequest::new(masked, &self.source_language, &self.target_language);
        request.context = context::assemble(&job.unit, &self.glossary, actors, &self.history);
        request.mode = mode.clone();

        let mut provider_calls = 0;
        let raw = match self.provider.translate(&request).await {
            Ok(text) => {
                provider_calls += 1;
                text
            }
            Err(e) => {
                return JobResult::Failed {
                    error: e.to_string(),
                    provider_calls,
                }
            }
        };
        let mut outcome = unmask(&raw, &map);

        // One intensified retry when source script leaks through, then
        // accept whatever came back
        if has_source_leakage(&outcome.text) {
            debug!("Source leakage in {}, retrying intensified", job.unit.id);
            request.intensify = true;
            match self.provider.translate(&request).await {
                Ok(retry_raw) => {
                    provider_calls += 1;
                    outcome = unmask(&retry_raw, &map);
                }
                Err(e) => {
                    warn!("Intensified retry for {} failed: {}", job.unit.id, e);
                }
            }
        }

        if !outcome.is_clean() {
            warn!(
                "Unit {}: repaired {} dropped token(s), removed {} unknown token(s)",
                job.unit.id,
                outcome.missing.len(),
                outcome.unknown.len()
            );
        }
        let leaked = has_source_leakage(&outcome.text);
        JobResult::Done {
            translation: outcome.text,
            from_memory: false,
            provider_calls,
            leaked,
        }
    }
}

/// Queue construction: every unit the pass covers that still needs work,
/// in the requested order, grouped by identical source text.
fn build_jobs(state: &ProjectState, pass: BatchPass, ordering: JobOrdering) -> Vec<TranslationJob> {
    let mut queue: Vec<&TranslationUnit> = state
        .units
        .iter()
        .filter(|u| {
            pass.includes(u.category)
                && !u.status.is_batch_skipped()
                && !u.source_text.trim().is_empty()
        })
        .collect();
    match ordering {
        JobOrdering::Document => queue.sort_by_key(|u| u.order_key),
        JobOrdering::ActorGrouped => {
            queue.sort_by_key(|u| (speaker_bucket(state, u), u.order_key))
        }
    }

    let mut jobs: Vec<TranslationJob> = Vec::new();
    let mut by_source: HashMap<&str, usize> = HashMap::new();
    for unit in queue {
        match by_source.get(unit.source_text.as_str()) {
            Some(&index) => jobs[index].member_ids.push(unit.id.clone()),
            None => {
                by_source.insert(unit.source_text.as_str(), jobs.len());
                jobs.push(TranslationJob {
                    unit: unit.clone(),
                    member_ids: vec![unit.id.clone()],
                    text: unit.source_text.clone(),
                });
            }
        }
    }
    jobs
}

/// Grouping key for queue order: dialogue by its speaker's gender so one
/// character's lines translate together, everything else afterwards
fn speaker_bucket(state: &ProjectState, unit: &TranslationUnit) -> u8 {
    if !unit.category.is_dialogue_like() {
        return 3;
    }
    match unit.speaker.as_deref() {
        Some(speaker) => actors::gender_for_speaker(&state.actors, speaker).bucket(),
        None => 3,
    }
}

/// Copy translated names from completed name units onto the actor
/// registry so the pronoun block shows both names.
fn sync_actor_names(state: &mut ProjectState) {
    let mut translated: HashMap<String, String> = HashMap::new();
    for unit in &state.units {
        if unit.category.feeds_glossary() && unit.status.is_done() {
            if let Some(t) = &unit.translated_text {
                translated.insert(unit.source_text.clone(), t.clone());
            }
        }
    }
    for actor in &mut state.actors {
        if actor.translated_name.is_none() {
            if let Some(t) = translated.get(&actor.name) {
                actor.translated_name = Some(t.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::Gender;
    use crate::project::UnitId;
    use crate::providers::mock::MockProvider;

    fn dialogue(path: &str, text: &str, order: usize) -> TranslationUnit {
        TranslationUnit::new(
            UnitId::new("Map001.json", path),
            ContentCategory::Dialogue,
            text,
            order,
        )
    }

    fn engine(provider: MockProvider) -> Orchestrator {
        Orchestrator::new(Arc::new(provider), &Config::default(), GlossaryStore::new())
    }

    #[tokio::test]
    async fn test_runBatch_duplicateSources_shouldMakeOneProviderCall() {
        let provider = MockProvider::scripted(&[("おはよう", "Good morning")]);
        let counter = provider.call_counter();
        let engine = engine(provider);

        let units = vec![
            dialogue("Ev1/p0/dialog_0", "おはよう", 0),
            dialogue("Ev2/p0/dialog_0", "おはよう", 1),
            dialogue("Ev3/p0/dialog_0", "おはよう", 2),
        ];
        let mut state = ProjectState::new("/game", units);
        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();

        assert_eq!(summary.completed, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for unit in &state.units {
            assert_eq!(unit.translated_text.as_deref(), Some("Good morning"));
            assert_eq!(unit.status, UnitStatus::Translated);
        }
    }

    #[tokio::test]
    async fn test_runBatch_leakyProvider_shouldRetryExactlyOnce() {
        let provider = MockProvider::leaky(2);
        let counter = provider.call_counter();
        let engine = engine(provider);

        let mut state = ProjectState::new("/game", vec![dialogue("Ev1/p0/dialog_0", "おはよう", 0)]);
        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();

        // First call leaks, the single intensified retry also leaks, and
        // the result is accepted anyway
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.leakage_accepted, 1);
    }

    #[tokio::test]
    async fn test_runBatch_seededMemory_shouldSkipProvider() {
        let provider = MockProvider::failing();
        let counter = provider.call_counter();
        let engine = engine(provider);

        let mut done = dialogue("Ev1/p0/dialog_0", "おはよう", 0);
        done.set_translated("Good morning".to_string());
        let pending = dialogue("Ev2/p0/dialog_0", "おはよう", 1);
        let mut state = ProjectState::new("/game", vec![done, pending]);

        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.from_memory, 1);
        assert_eq!(
            state.units[1].translated_text.as_deref(),
            Some("Good morning")
        );
    }

    #[tokio::test]
    async fn test_runBatch_failingProvider_shouldMarkUnitsFailed() {
        let engine = engine(MockProvider::failing());
        let mut state = ProjectState::new("/game", vec![dialogue("Ev1/p0/dialog_0", "おはよう", 0)]);
        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(state.units[0].status, UnitStatus::Failed);
        assert!(state.units[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_runBatch_namePass_shouldFeedGlossaryAndActors() {
        let engine = engine(MockProvider::scripted(&[("リリィ", "Lily")]));

        let name_unit = TranslationUnit::new(
            UnitId::new("Actors.json", "1/name"),
            ContentCategory::Name,
            "リリィ",
            0,
        );
        let mut state = ProjectState::new("/game", vec![name_unit]);
        state.actors.push(ActorRecord {
            id: 1,
            name: "リリィ".to_string(),
            translated_name: None,
            gender: Gender::Female,
        });

        engine
            .run_batch(&mut state, BatchPass::Names, |_| {})
            .await
            .unwrap();

        assert_eq!(engine.glossary.get("リリィ").as_deref(), Some("Lily"));
        assert_eq!(state.actors[0].translated_name.as_deref(), Some("Lily"));
    }

    #[tokio::test]
    async fn test_runBatch_checkpointInterval_shouldEmitAtCadence() {
        let mut config = Config::default();
        config.batch.checkpoint_interval = 2;
        let engine = Orchestrator::new(
            Arc::new(MockProvider::echo()),
            &config,
            GlossaryStore::new(),
        );

        let units: Vec<TranslationUnit> = (0..5)
            .map(|i| dialogue(&format!("Ev{i}/p0/dialog_0"), &format!("テキスト{i}"), i))
            .collect();
        let mut state = ProjectState::new("/game", units);

        let checkpoints = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&checkpoints);
        engine
            .run_batch(&mut state, BatchPass::Full, move |event| {
                if let ProgressEvent::Checkpoint { completed, .. } = event {
                    sink.lock().push(completed);
                }
            })
            .await
            .unwrap();

        assert_eq!(*checkpoints.lock(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_runBatch_skippedUnits_shouldStayUntouched() {
        let engine = engine(MockProvider::echo());
        let skipped = dialogue("Ev1/p0/dialog_0", "[image]", 0).skipped();
        let mut state = ProjectState::new("/game", vec![skipped]);

        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(state.units[0].status, UnitStatus::Skipped);
    }

    #[tokio::test]
    async fn test_runBatch_droppedTokens_shouldRepairTranslation() {
        let engine = engine(MockProvider::dropping_tokens());
        let mut state = ProjectState::new(
            "/game",
            vec![dialogue("Ev1/p0/dialog_0", "\\C[2]こんにちは\\C[0]", 0)],
        );

        engine
            .run_batch(&mut state, BatchPass::Full, |_| {})
            .await
            .unwrap();

        // Both tokens were dropped; numbering-based repair puts them back
        // in original relative order at the text start
        let translated = state.units[0].translated_text.as_deref().unwrap();
        assert!(translated.starts_with("\\C[2]\\C[0]"));
        assert!(translated.contains("こんにちは"));
    }

    #[tokio::test]
    async fn test_translateUnit_correctionMode_shouldReplaceTranslation() {
        let engine = engine(MockProvider::scripted(&[("おはよう", "Good morning!")]));
        let mut unit = dialogue("Ev1/p0/dialog_0", "おはよう", 0);
        unit.set_translated("Good evening".to_string());
        let id = unit.id.clone();
        let mut state = ProjectState::new("/game", vec![unit]);

        let translation = engine
            .translate_unit(
                &mut state,
                &id,
                TranslationMode::Correction {
                    previous: "Good evening".to_string(),
                    hint: "It is morning".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(translation, "Good morning!");
        assert_eq!(
            state.units[0].translated_text.as_deref(),
            Some("Good morning!")
        );
    }

    #[tokio::test]
    async fn test_translateUnit_unknownId_shouldError() {
        let engine = engine(MockProvider::echo());
        let mut state = ProjectState::new("/game", vec![]);
        let missing = UnitId::new("Map001.json", "Ev9/p0/dialog_0");
        let result = engine
            .translate_unit(&mut state, &missing, TranslationMode::Standard)
            .await;
        assert!(matches!(result, Err(TranslationError::UnitNotFound(_))));
    }

    #[tokio::test]
    async fn test_generateVariants_shouldReturnOnePerTemperature() {
        let engine = engine(MockProvider::echo());
        let unit = dialogue("Ev1/p0/dialog_0", "おはよう", 0);
        let id = unit.id.clone();
        let state = ProjectState::new("/game", vec![unit]);

        let variants = engine.generate_variants(&state, &id).await.unwrap();
        assert_eq!(variants.len(), VARIANT_TEMPERATURES.len());
        // Variant generation must not touch the project state
        assert!(state.units[0].translated_text.is_none());
    }

    #[tokio::test]
    async fn test_runPolish_shouldRewriteDoneUnitsOnly() {
        let engine = engine(MockProvider::echo());
        let mut done = dialogue("Ev1/p0/dialog_0", "おはよう", 0);
        done.set_translated("good morning".to_string());
        let pending = dialogue("Ev2/p0/dialog_0", "さようなら", 1);
        let mut state = ProjectState::new("/game", vec![done, pending]);

        let summary = engine.run_polish(&mut state, |_| {}).await.unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(
            state.units[0].translated_text.as_deref(),
            Some("[EN] good morning")
        );
        assert!(state.units[1].translated_text.is_none());
    }

    #[test]
    fn test_batchPass_includes_shouldPartitionCategories() {
        assert!(BatchPass::Names.includes(ContentCategory::Name));
        assert!(!BatchPass::Names.includes(ContentCategory::Dialogue));
        assert!(BatchPass::Database.includes(ContentCategory::Description));
        assert!(BatchPass::Dialogue.includes(ContentCategory::Choice));
        assert!(BatchPass::Full.includes(ContentCategory::MapName));
    }

    fn spoken(path: &str, text: &str, speaker: &str, order: usize) -> TranslationUnit {
        dialogue(path, text, order).with_speaker(Some(speaker.to_string()))
    }

    fn actor(id: u32, name: &str, gender: Gender) -> ActorRecord {
        ActorRecord {
            id,
            name: name.to_string(),
            translated_name: None,
            gender,
        }
    }

    #[test]
    fn test_jobOrdering_forPass_shouldGroupOnlyDialoguePass() {
        assert_eq!(JobOrdering::for_pass(BatchPass::Dialogue), JobOrdering::ActorGrouped);
        assert_eq!(JobOrdering::for_pass(BatchPass::Full), JobOrdering::Document);
        assert_eq!(JobOrdering::for_pass(BatchPass::Database), JobOrdering::Document);
        assert_eq!(JobOrdering::for_pass(BatchPass::Names), JobOrdering::Document);
    }

    #[test]
    fn test_buildJobs_documentOrdering_shouldFollowOrderKey() {
        let mut state = ProjectState::new(
            "/game",
            vec![
                spoken("Ev3/p0/dialog_0", "みっつ", "リリィ", 2),
                TranslationUnit::new(
                    UnitId::new("Actors.json", "1/name"),
                    ContentCategory::Name,
                    "リリィ",
                    0,
                ),
                spoken("Ev2/p0/dialog_0", "ふたつ", "ガイ", 1),
            ],
        );
        state.actors.push(actor(1, "リリィ", Gender::Female));
        state.actors.push(actor(2, "ガイ", Gender::Male));

        let jobs = build_jobs(&state, BatchPass::Full, JobOrdering::Document);
        let order: Vec<usize> = jobs.iter().map(|j| j.unit.order_key).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_buildJobs_actorGrouped_shouldBucketBySpeakerGender() {
        let mut state = ProjectState::new(
            "/game",
            vec![
                spoken("Ev1/p0/dialog_0", "ひとつ", "ガイ", 0),
                spoken("Ev2/p0/dialog_0", "ふたつ", "リリィ", 1),
                spoken("Ev3/p0/dialog_0", "みっつ", "誰か", 2),
                spoken("Ev4/p0/dialog_0", "よっつ", "リリィ", 3),
            ],
        );
        state.actors.push(actor(1, "リリィ", Gender::Female));
        state.actors.push(actor(2, "ガイ", Gender::Male));

        let jobs = build_jobs(&state, BatchPass::Dialogue, JobOrdering::ActorGrouped);
        let order: Vec<usize> = jobs.iter().map(|j| j.unit.order_key).collect();
        // Female speaker's lines first, then male, then the unknown one
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[tokio::test]
    async fn test_runBatch_cancelMidBatch_shouldFinishInFlightOnly() {
        let mut config = Config::default();
        config.batch.workers = 2;
        let provider = MockProvider::slow(20);
        let counter = provider.call_counter();
        let engine = Orchestrator::new(Arc::new(provider), &config, GlossaryStore::new());

        let units = vec![
            dialogue("Ev1/p0/dialog_0", "alpha", 0),
            dialogue("Ev2/p0/dialog_0", "beta", 1),
            dialogue("Ev3/p0/dialog_0", "gamma", 2),
        ];
        let mut state = ProjectState::new("/game", units);

        let summary = engine
            .run_batch(&mut state, BatchPass::Full, |event| {
                if matches!(event, ProgressEvent::UnitCompleted { .. }) {
                    engine.cancel();
                }
            })
            .await
            .unwrap();

        // Two jobs were in flight when the first finished and cancelled
        // the run; both complete and apply, the third never dispatches
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        let untouched = state
            .units
            .iter()
            .filter(|u| u.status == UnitStatus::Untranslated)
            .count();
        assert_eq!(untouched, 1);
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_generateVariants_inFlightUnit_shouldBeRejected() {
        let engine = engine(MockProvider::echo());
        let unit = dialogue("Ev1/p0/dialog_0", "おはよう", 0);
        let id = unit.id.clone();
        let state = ProjectState::new("/game", vec![unit]);

        engine.in_flight.lock().insert(id.clone());
        let result = engine.generate_variants(&state, &id).await;
        assert!(matches!(result, Err(TranslationError::UnitInFlight(_))));
    }
}
