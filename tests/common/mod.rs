/*!
 * Common test utilities for the gamemtl test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;

// Re-export the mock providers module
pub mod mock_providers;

/// Initializes logging for tests; honors RUST_LOG, safe to call repeatedly
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Builds a small but complete RPG Maker project tree under `root`:
/// a database, System.json terms, one common event, and one map with
/// a speaker header, a merged dialogue block, and choices.
pub fn build_fixture_project(root: &Path) -> Result<PathBuf> {
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir)?;

    let system = json!({
        "gameTitle": "夢魔の城",
        "terms": {
            "basic": ["レベル"],
            "commands": ["戦う"],
            "params": [],
            "messages": {"alwaysDash": "常時ダッシュ"}
        },
        "elements": ["火"],
        "skillTypes": [],
        "weaponTypes": [],
        "armorTypes": [],
        "equipTypes": []
    });
    fs::write(
        data_dir.join("System.json"),
        serde_json::to_string_pretty(&system)?,
    )?;

    let actors = json!([
        null,
        {
            "id": 1,
            "name": "リリィ",
            "nickname": "",
            "profile": "夢魔の少女。",
            "note": ""
        }
    ]);
    fs::write(
        data_dir.join("Actors.json"),
        serde_json::to_string_pretty(&actors)?,
    )?;

    let common_events = json!([
        null,
        {
            "id": 1,
            "name": "greeting",
            "list": [
                {"code": 401, "indent": 0, "parameters": ["おはよう"]},
                {"code": 0, "indent": 0, "parameters": []}
            ]
        }
    ]);
    fs::write(
        data_dir.join("CommonEvents.json"),
        serde_json::to_string_pretty(&common_events)?,
    )?;

    let map = json!({
        "displayName": "夢魔の城・入口",
        "events": [
            null,
            {
                "id": 1,
                "name": "EV001",
                "pages": [
                    {
                        "list": [
                            {"code": 101, "indent": 0, "parameters": ["", 0, 0, 2, "リリィ"]},
                            {"code": 401, "indent": 0, "parameters": ["いらっしゃい。"]},
                            {"code": 401, "indent": 0, "parameters": ["ゆっくりしていってね。"]},
                            {"code": 102, "indent": 0, "parameters": [["はい", "いいえ"], 1]},
                            {"code": 0, "indent": 0, "parameters": []}
                        ]
                    }
                ]
            }
        ]
    });
    fs::write(
        data_dir.join("Map001.json"),
        serde_json::to_string_pretty(&map)?,
    )?;

    Ok(data_dir)
}
