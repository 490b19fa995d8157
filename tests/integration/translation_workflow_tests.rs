/*!
 * End-to-end workflow tests: extract a fixture project, run a batch
 * through a scripted provider, persist, and resume.
 */

use std::sync::atomic::Ordering;
use std::sync::Arc;

use gamemtl::app_config::Config;
use gamemtl::app_controller::Controller;
use gamemtl::consistency::GlossaryStore;
use gamemtl::orchestrator::events::ProgressEvent;
use gamemtl::orchestrator::{BatchPass, Orchestrator};
use gamemtl::project::{ContentCategory, ProjectState, TranslationUnit, UnitId, UnitStatus};
use gamemtl::providers::mock::MockProvider;

use crate::common;
use crate::common::mock_providers::fixture_provider;

#[tokio::test]
async fn test_workflow_fullBatch_shouldTranslateEveryUnit() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    let mut state = controller.open_project(dir.path()).unwrap();
    assert_eq!(state.units.len(), 13);

    let provider = fixture_provider();
    let calls = provider.call_counter();
    let glossary = GlossaryStore::new();
    let engine = Orchestrator::new(Arc::new(provider), &Config::default(), glossary.clone());

    let summary = engine
        .run_batch(&mut state, BatchPass::Full, |_| {})
        .await
        .unwrap();

    assert_eq!(summary.total, 13);
    assert_eq!(summary.completed, 13);
    assert_eq!(summary.failed, 0);
    // The actor name and the speaker credit share one source string,
    // so one provider call covers both units
    assert_eq!(calls.load(Ordering::SeqCst), 12);

    let dialogue = state
        .unit(&UnitId::new("Map001.json", "Ev1(EV001)/p0/dialog_1"))
        .unwrap();
    assert_eq!(dialogue.status, UnitStatus::Translated);
    assert_eq!(
        dialogue.translated_text.as_deref(),
        Some("Welcome.\nMake yourself at home.")
    );

    let title = state.unit(&UnitId::new("System.json", "gameTitle")).unwrap();
    assert_eq!(
        title.translated_text.as_deref(),
        Some("Castle of the Succubus")
    );

    // Name units feed the glossary and the live actor roster
    assert_eq!(glossary.get("リリィ"), Some("Lily".to_string()));
    assert_eq!(state.actors[0].translated_name.as_deref(), Some("Lily"));
}

#[tokio::test]
async fn test_workflow_reopenedProject_shouldNotRetranslate() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    let mut state = controller.open_project(dir.path()).unwrap();

    let engine = Orchestrator::new(
        Arc::new(fixture_provider()),
        &Config::default(),
        GlossaryStore::new(),
    );
    engine
        .run_batch(&mut state, BatchPass::Full, |_| {})
        .await
        .unwrap();
    state.save(&Controller::state_path(dir.path())).unwrap();

    // Re-extraction merges the saved translations back in; a second
    // batch finds nothing queued and never touches the provider
    let mut reopened = controller.open_project(dir.path()).unwrap();
    assert_eq!(reopened.stats().translated, 13);

    let failing = MockProvider::failing();
    let calls = failing.call_counter();
    let second = Orchestrator::new(
        Arc::new(failing),
        &Config::default(),
        GlossaryStore::new(),
    );
    let summary = second
        .run_batch(&mut reopened, BatchPass::Full, |_| {})
        .await
        .unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_workflow_namesPass_shouldOnlyTouchNameUnits() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    let mut state = controller.open_project(dir.path()).unwrap();

    let glossary = GlossaryStore::new();
    let engine = Orchestrator::new(
        Arc::new(fixture_provider()),
        &Config::default(),
        glossary.clone(),
    );
    let summary = engine
        .run_batch(&mut state, BatchPass::Names, |_| {})
        .await
        .unwrap();

    // Actor name and its speaker credit
    assert_eq!(summary.completed, 2);
    assert_eq!(glossary.get("リリィ"), Some("Lily".to_string()));
    let dialogue = state
        .unit(&UnitId::new("Map001.json", "Ev1(EV001)/p0/dialog_1"))
        .unwrap();
    assert_eq!(dialogue.status, UnitStatus::Untranslated);
}

#[test]
fn test_workflow_cancelMidBatch_shouldKeepCompletedWork() {
    common::init_test_logging();

    fn line(path: &str, text: &str, order: usize) -> TranslationUnit {
        TranslationUnit::new(
            UnitId::new("Map001.json", path),
            ContentCategory::Dialogue,
            text,
            order,
        )
    }

    let (summary, state, calls) = tokio_test::block_on(async {
        let mut config = Config::default();
        config.batch.workers = 1;
        let provider = MockProvider::slow(10);
        let calls = provider.call_counter();
        let engine = Orchestrator::new(Arc::new(provider), &config, GlossaryStore::new());

        let units = vec![
            line("Ev1/p0/dialog_0", "first line", 0),
            line("Ev2/p0/dialog_0", "second line", 1),
            line("Ev3/p0/dialog_0", "third line", 2),
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
        (summary, state, calls.load(Ordering::SeqCst))
    });

    // The single in-flight unit finishes and is kept; the two queued
    // units never reach the provider and stay queued for the next run
    assert_eq!(summary.total, 3);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(calls, 1);
    assert_eq!(state.stats().translated, 1);
    assert_eq!(state.stats().untranslated, 2);
}
