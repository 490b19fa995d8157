/*!
 * Export tests: translations land in the game data tree, the snapshot
 * keeps the original text, and exporting twice changes nothing.
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;

use gamemtl::app_config::Config;
use gamemtl::app_controller::Controller;
use gamemtl::consistency::GlossaryStore;
use gamemtl::orchestrator::{BatchPass, Orchestrator};
use gamemtl::project::{ContentCategory, ProjectState, TranslationUnit, UnitId};
use serde_json::Value;

use crate::common;
use crate::common::mock_providers::fixture_provider;

const DATA_FILES: [&str; 4] = [
    "System.json",
    "Actors.json",
    "CommonEvents.json",
    "Map001.json",
];

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Extract, translate with the scripted provider, and persist the state
async fn translate_fixture(root: &Path, controller: &Controller) {
    let mut state = controller.open_project(root).unwrap();
    let glossary = GlossaryStore::new();
    let engine = Orchestrator::new(
        Arc::new(fixture_provider()),
        &Config::default(),
        glossary.clone(),
    );
    engine
        .run_batch(&mut state, BatchPass::Full, |_| {})
        .await
        .unwrap();
    state.project_glossary = glossary.project_terms();
    state.save(&Controller::state_path(root)).unwrap();
}

#[tokio::test]
async fn test_export_shouldWriteTranslationsIntoDataTree() {
    let dir = common::create_temp_dir().unwrap();
    let data_dir = common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    translate_fixture(dir.path(), &controller).await;
    let stats = controller.export(dir.path(), false).unwrap();
    assert!(stats.missing.is_empty());

    let system = read_json(&data_dir.join("System.json"));
    assert_eq!(system["gameTitle"], "Castle of the Succubus");
    assert_eq!(system["terms"]["messages"]["alwaysDash"], "Always Dash");
    assert_eq!(system["terms"]["basic"][0], "Level");
    assert_eq!(system["terms"]["commands"][0], "Fight");
    assert_eq!(system["elements"][0], "Fire");

    let actors = read_json(&data_dir.join("Actors.json"));
    assert_eq!(actors[1]["name"], "Lily");
    assert_eq!(actors[1]["profile"], "A succubus girl.");

    let common_events = read_json(&data_dir.join("CommonEvents.json"));
    let ce_text = serde_json::to_string(&common_events).unwrap();
    assert!(ce_text.contains("Good morning."));

    let map = read_json(&data_dir.join("Map001.json"));
    assert_eq!(map["displayName"], "Castle Entrance");
    let commands = map["events"][1]["pages"][0]["list"].as_array().unwrap();
    let speaker_header = commands
        .iter()
        .find(|c| c["code"] == 101)
        .unwrap();
    assert_eq!(speaker_header["parameters"][4], "Lily");
    let map_text = serde_json::to_string(&map).unwrap();
    assert!(map_text.contains("Welcome."));
    assert!(map_text.contains("Make yourself at home."));
    assert!(map_text.contains("\"Yes\""));
    assert!(map_text.contains("\"No\""));
}

#[tokio::test]
async fn test_export_shouldKeepPristineSnapshot() {
    let dir = common::create_temp_dir().unwrap();
    let data_dir = common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    translate_fixture(dir.path(), &controller).await;
    controller.export(dir.path(), false).unwrap();

    let backup = data_dir.with_file_name("data_original");
    let snapshot = fs::read_to_string(backup.join("Map001.json")).unwrap();
    assert!(snapshot.contains("いらっしゃい。"));
    assert!(!snapshot.contains("Welcome."));
}

#[tokio::test]
async fn test_export_secondRun_shouldBeByteIdentical() {
    let dir = common::create_temp_dir().unwrap();
    let data_dir = common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    translate_fixture(dir.path(), &controller).await;
    controller.export(dir.path(), false).unwrap();

    let first: Vec<Vec<u8>> = DATA_FILES
        .iter()
        .map(|f| fs::read(data_dir.join(f)).unwrap())
        .collect();

    // The snapshot exists now, so strict mode must also succeed
    controller.export(dir.path(), true).unwrap();
    for (name, before) in DATA_FILES.iter().zip(&first) {
        let after = fs::read(data_dir.join(name)).unwrap();
        assert_eq!(&after, before, "{name} changed on re-export");
    }
}

#[tokio::test]
async fn test_export_strict_unknownFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let controller = Controller::new_for_test().unwrap();
    translate_fixture(dir.path(), &controller).await;

    let state_path = Controller::state_path(dir.path());
    let mut state = ProjectState::load(&state_path).unwrap();
    let mut ghost = TranslationUnit::new(
        UnitId::new("Ghost.json", "dialog_1"),
        ContentCategory::Dialogue,
        "テスト",
        999,
    );
    ghost.set_translated("Test".to_string());
    state.units.push(ghost);
    state.save(&state_path).unwrap();

    assert!(controller.export(dir.path(), true).is_err());
    // Lenient mode reports the orphan instead of failing
    let stats = controller.export(dir.path(), false).unwrap();
    assert_eq!(stats.missing, vec![UnitId::new("Ghost.json", "dialog_1")]);
}
