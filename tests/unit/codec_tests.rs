/*!
 * Extraction tests over a complete fixture project tree
 */

use gamemtl::codec::extract_project;
use gamemtl::consistency::Gender;
use gamemtl::project::{ContentCategory, UnitId, UnitStatus};

use crate::common;

#[test]
fn test_extractProject_fixture_shouldEmitExpectedUnits() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let result = extract_project(dir.path()).unwrap();
    assert_eq!(result.game_title, "夢魔の城");
    assert_eq!(result.units.len(), 13);

    let dialogue = result
        .units
        .iter()
        .find(|u| u.id == UnitId::new("Map001.json", "Ev1(EV001)/p0/dialog_1"))
        .unwrap();
    assert_eq!(dialogue.category, ContentCategory::Dialogue);
    assert_eq!(dialogue.source_text, "いらっしゃい。\nゆっくりしていってね。");
    assert_eq!(dialogue.segment_count, 2);
    assert_eq!(dialogue.speaker.as_deref(), Some("リリィ"));
    assert_eq!(dialogue.status, UnitStatus::Untranslated);

    let choices: Vec<_> = result
        .units
        .iter()
        .filter(|u| u.category == ContentCategory::Choice)
        .collect();
    assert_eq!(choices.len(), 2);
    assert_eq!(choices[0].source_text, "はい");
    assert_eq!(choices[1].source_text, "いいえ");

    assert!(result
        .units
        .iter()
        .any(|u| u.id == UnitId::new("System.json", "terms/messages/alwaysDash")));
    assert!(result
        .units
        .iter()
        .any(|u| u.id == UnitId::new("Map001.json", "displayName")));
    assert!(result
        .units
        .iter()
        .any(|u| u.id == UnitId::new("Actors.json", "1/profile")));
}

#[test]
fn test_extractProject_fixture_shouldRegisterSpeakerOncePerName() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let result = extract_project(dir.path()).unwrap();
    let speakers: Vec<_> = result
        .units
        .iter()
        .filter(|u| u.category == ContentCategory::SpeakerName)
        .collect();
    assert_eq!(speakers.len(), 1);
    assert_eq!(speakers[0].source_text, "リリィ");
}

#[test]
fn test_extractProject_fixture_shouldDetectActorGender() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let result = extract_project(dir.path()).unwrap();
    assert_eq!(result.actors.len(), 1);
    assert_eq!(result.actors[0].name, "リリィ");
    // Profile says 夢魔の少女
    assert_eq!(result.actors[0].gender, Gender::Female);
}

#[test]
fn test_extractProject_reExtraction_shouldKeepStableIdentities() {
    let dir = common::create_temp_dir().unwrap();
    common::build_fixture_project(dir.path()).unwrap();

    let first: Vec<_> = extract_project(dir.path())
        .unwrap()
        .units
        .into_iter()
        .map(|u| u.id)
        .collect();
    let second: Vec<_> = extract_project(dir.path())
        .unwrap()
        .units
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_extractProject_missingDataDir_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    assert!(extract_project(dir.path()).is_err());
}
