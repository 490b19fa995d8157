/*!
 * Extraction: RPG Maker JSON data tree -> flat ordered unit list.
 *
 * Walks the database files, System.json, CommonEvents, Troops pages, and
 * map event pages, emitting one `TranslationUnit` per translatable string.
 * Consecutive Show Text (401) and Scroll Text (405) lines merge into one
 * unit per block. Dialogue blocks that fail the source-script filter still
 * get a `skipped` unit so ordering slots stay aligned across game versions.
 */

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::Value;

use crate::codec::commands::{
    database_fields, is_plugin_display_text, mv_plugin_display_text, ACTOR_CODE,
    CODE_CHANGE_NAME, CODE_CHANGE_NICKNAME, CODE_CHANGE_PROFILE, CODE_PLUGIN_COMMAND_MV,
    CODE_PLUGIN_COMMAND_MZ, CODE_SCROLL_TEXT, CODE_SHOW_CHOICES, CODE_SHOW_TEXT,
    CODE_SHOW_TEXT_HEADER, DATABASE_FILES, MZ_PLUGIN_WHITELIST, NAMEBOX, SYSTEM_TYPE_ARRAYS,
};
use crate::consistency::ActorRecord;
use crate::errors::CodecError;
use crate::file_utils::{EngineKind, FileManager};
use crate::language_utils::has_japanese;
use crate::project::{ContentCategory, TranslationUnit, UnitId};

/// Everything extraction produces from one project tree
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub units: Vec<TranslationUnit>,
    pub actors: Vec<ActorRecord>,
    pub game_title: String,
    pub engine: EngineKind,
}

/// Command code as u32, 0 when absent
fn cmd_code(cmd: &Value) -> u32 {
    cmd.get("code").and_then(Value::as_u64).unwrap_or(0) as u32
}

/// String parameter at an index, empty when absent or not a string
fn param_str(cmd: &Value, index: usize) -> &str {
    cmd.get("parameters")
        .and_then(Value::as_array)
        .and_then(|p| p.get(index))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Extraction state shared across all files of one project
struct Extractor {
    units: Vec<TranslationUnit>,
    actor_names: HashMap<u32, String>,
    seen_speakers: HashSet<String>,
    order: usize,
}

impl Extractor {
    fn new(actor_names: HashMap<u32, String>) -> Self {
        Self {
            units: Vec::new(),
            actor_names,
            seen_speakers: HashSet::new(),
            order: 0,
        }
    }

    fn should_extract(&self, text: &str) -> bool {
        !text.trim().is_empty() && has_japanese(text)
    }

    fn push(&mut self, unit: TranslationUnit) {
        self.units.push(unit);
        self.order += 1;
    }

    fn next_unit(
        &mut self,
        file: &str,
        path: String,
        category: ContentCategory,
        text: impl Into<String>,
    ) -> TranslationUnit {
        let unit = TranslationUnit::new(UnitId::new(file, path), category, text, self.order);
        unit
    }

    // Database files: whitelisted fields per item, addressed by item id.
    fn parse_database_files(&mut self, data_dir: &Path) -> Result<()> {
        for (file_name, fields) in DATABASE_FILES {
            let path = data_dir.join(file_name);
            if !FileManager::file_exists(&path) {
                continue;
            }
            let data = read_data_json(&path, file_name)?;
            let Some(items) = data.as_array() else { continue };

            for item in items {
                let Some(obj) = item.as_object() else { continue };
                let item_id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);
                for field in *fields {
                    let Some(text) = obj.get(*field).and_then(Value::as_str) else {
                        continue;
                    };
                    if self.should_extract(text) {
                        let unit = self.next_unit(
                            file_name,
                            format!("{item_id}/{field}"),
                            category_for_db_field(field),
                            text,
                        );
                        self.push(unit);
                    }
                }
            }
        }
        Ok(())
    }

    // System.json: game title, term tables, type arrays.
    fn parse_system(&mut self, data_dir: &Path) -> Result<String> {
        let path = data_dir.join("System.json");
        if !FileManager::file_exists(&path) {
            return Ok(String::new());
        }
        let data = read_data_json(&path, "System.json")?;

        let title = data.get("gameTitle").and_then(Value::as_str).unwrap_or("");
        if self.should_extract(title) {
            let unit = self.next_unit(
                "System.json",
                "gameTitle".to_string(),
                ContentCategory::SystemTerm,
                title,
            );
            self.push(unit);
        }

        let terms = data.get("terms").cloned().unwrap_or(Value::Null);

        // messages: array in MZ, object in MV
        match terms.get("messages") {
            Some(Value::Array(messages)) => {
                for (i, msg) in messages.iter().enumerate() {
                    self.push_system_term(msg, format!("terms/messages/{i}"));
                }
            }
            Some(Value::Object(messages)) => {
                for (key, msg) in messages {
                    self.push_system_term(msg, format!("terms/messages/{key}"));
                }
            }
            _ => {}
        }

        for table in ["commands", "params", "basic"] {
            if let Some(Value::Array(values)) = terms.get(table) {
                for (i, value) in values.iter().enumerate() {
                    self.push_system_term(value, format!("terms/{table}/{i}"));
                }
            }
        }

        for arr_name in SYSTEM_TYPE_ARRAYS {
            if let Some(Value::Array(values)) = data.get(*arr_name) {
                for (i, value) in values.iter().enumerate() {
                    self.push_system_term(value, format!("{arr_name}/{i}"));
                }
            }
        }

        Ok(title.to_string())
    }

    fn push_system_term(&mut self, value: &Value, path: String) {
        if let Some(text) = value.as_str() {
            if self.should_extract(text) {
                let unit =
                    self.next_unit("System.json", path, ContentCategory::SystemTerm, text);
                self.push(unit);
            }
        }
    }

    fn parse_common_events(&mut self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("CommonEvents.json");
        if !FileManager::file_exists(&path) {
            return Ok(());
        }
        let data = read_data_json(&path, "CommonEvents.json")?;
        let Some(events) = data.as_array() else { return Ok(()) };

        for event in events {
            let Some(obj) = event.as_object() else { continue };
            let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);
            let name = obj.get("name").and_then(Value::as_str).unwrap_or("");
            if let Some(list) = obj.get("list").and_then(Value::as_array) {
                self.extract_event_commands(list, "CommonEvents.json", &format!("CE{id}({name})"));
            }
        }
        Ok(())
    }

    fn parse_troop_pages(&mut self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("Troops.json");
        if !FileManager::file_exists(&path) {
            return Ok(());
        }
        let data = read_data_json(&path, "Troops.json")?;
        let Some(troops) = data.as_array() else { return Ok(()) };

        for troop in troops {
            let Some(obj) = troop.as_object() else { continue };
            let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);
            let name = obj.get("name").and_then(Value::as_str).unwrap_or("");
            let Some(pages) = obj.get("pages").and_then(Value::as_array) else {
                continue;
            };
            for (page_idx, page) in pages.iter().enumerate() {
                if let Some(list) = page.get("list").and_then(Value::as_array) {
                    self.extract_event_commands(
                        list,
                        "Troops.json",
                        &format!("Troop{id}({name})/p{page_idx}"),
                    );
                }
            }
        }
        Ok(())
    }

    fn parse_maps(&mut self, data_dir: &Path) -> Result<()> {
        for path in FileManager::list_data_files(data_dir)? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !is_map_file(&file_name) {
                continue;
            }
            let data = read_data_json(&path, &file_name)?;

            let display_name = data.get("displayName").and_then(Value::as_str).unwrap_or("");
            if self.should_extract(display_name) {
                let unit = self.next_unit(
                    &file_name,
                    "displayName".to_string(),
                    ContentCategory::MapName,
                    display_name,
                );
                self.push(unit);
            }

            let Some(events) = data.get("events").and_then(Value::as_array) else {
                continue;
            };
            for event in events {
                let Some(obj) = event.as_object() else { continue };
                let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);
                let name = obj.get("name").and_then(Value::as_str).unwrap_or("");
                let Some(pages) = obj.get("pages").and_then(Value::as_array) else {
                    continue;
                };
                for (page_idx, page) in pages.iter().enumerate() {
                    if let Some(list) = page.get("list").and_then(Value::as_array) {
                        self.extract_event_commands(
                            list,
                            &file_name,
                            &format!("Ev{id}({name})/p{page_idx}"),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Register a speaker name unit once per unique name, project-wide
    fn push_speaker(&mut self, file: &str, name: &str) {
        if !self.should_extract(name) || self.seen_speakers.contains(name) {
            return;
        }
        self.seen_speakers.insert(name.to_string());
        let unit = self.next_unit(
            file,
            format!("speaker/{name}"),
            ContentCategory::SpeakerName,
            name,
        );
        self.push(unit);
    }

    /// Walk one event command list, merging 401/405 runs into blocks and
    /// tracking the current speaker from 101 headers and namebox prefixes.
    fn extract_event_commands(&mut self, cmd_list: &[Value], file: &str, prefix: &str) {
        let mut i = 0;
        let mut dialog_counter = 0usize;
        let mut current_speaker = String::new();

        while i < cmd_list.len() {
            let cmd = &cmd_list[i];
            let code = cmd_code(cmd);

            if code == CODE_SHOW_TEXT_HEADER {
                let face_name = param_str(cmd, 0);
                let speaker_name = param_str(cmd, 4);
                current_speaker = if speaker_name.is_empty() {
                    face_name.to_string()
                } else {
                    speaker_name.to_string()
                };
                self.push_speaker(file, speaker_name);
                i += 1;
                continue;
            }

            if code == CODE_SHOW_TEXT || code == CODE_SCROLL_TEXT {
                let mut lines = Vec::new();
                while i < cmd_list.len() && cmd_code(&cmd_list[i]) == code {
                    lines.push(param_str(&cmd_list[i], 0).to_string());
                    i += 1;
                }
                let segment_count = lines.len();
                let mut full_text = lines.join("\n");

                // Namebox prefix on the first line
                let mut namebox = None;
                if code == CODE_SHOW_TEXT {
                    if let Some(caps) = NAMEBOX.captures(&full_text) {
                        let raw = caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
                        let inner = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
                        full_text = full_text[raw.len()..].to_string();
                        if let Some(actor_caps) = ACTOR_CODE.captures(&inner) {
                            let actor_id: u32 = actor_caps[1].parse().unwrap_or(0);
                            current_speaker = self
                                .actor_names
                                .get(&actor_id)
                                .cloned()
                                .unwrap_or_else(|| inner.clone());
                        } else {
                            current_speaker = inner.clone();
                            self.push_speaker(file, &inner);
                        }
                        namebox = Some(raw);
                    } else if let Some(caps) = ACTOR_CODE.captures(&full_text) {
                        let raw = caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
                        let actor_id: u32 = caps[1].parse().unwrap_or(0);
                        full_text = full_text[raw.len()..].to_string();
                        current_speaker = self
                            .actor_names
                            .get(&actor_id)
                            .cloned()
                            .unwrap_or_else(|| raw.clone());
                        namebox = Some(raw);
                    }
                }

                // A block always consumes an ordering slot, even when it
                // holds no source-script text, so unit identities line up
                // across game versions with blank or edited lines.
                dialog_counter += 1;
                let (category, kind) = if code == CODE_SHOW_TEXT {
                    (ContentCategory::Dialogue, "dialog")
                } else {
                    (ContentCategory::ScrollText, "scroll")
                };
                let extractable = self.should_extract(&full_text);
                let mut unit = self
                    .next_unit(file, format!("{prefix}/{kind}_{dialog_counter}"), category, full_text)
                    .with_segments(segment_count)
                    .with_namebox(namebox)
                    .with_speaker((!current_speaker.is_empty()).then(|| current_speaker.clone()));
                if !extractable {
                    unit = unit.skipped();
                }
                self.push(unit);
                continue;
            }

            if code == CODE_SHOW_CHOICES {
                if let Some(choices) = cmd
                    .get("parameters")
                    .and_then(Value::as_array)
                    .and_then(|p| p.first())
                    .and_then(Value::as_array)
                {
                    for (ci, choice) in choices.iter().enumerate() {
                        let Some(text) = choice.as_str() else { continue };
                        if self.should_extract(text) {
                            dialog_counter += 1;
                            let unit = self.next_unit(
                                file,
                                format!("{prefix}/choice_{dialog_counter}_{ci}"),
                                ContentCategory::Choice,
                                text,
                            );
                            self.push(unit);
                        }
                    }
                }
            }

            if code == CODE_CHANGE_NAME || code == CODE_CHANGE_NICKNAME || code == CODE_CHANGE_PROFILE {
                let text = param_str(cmd, 1);
                if self.should_extract(text) {
                    let (category, kind) = match code {
                        CODE_CHANGE_NAME => (ContentCategory::Name, "name"),
                        CODE_CHANGE_NICKNAME => (ContentCategory::Nickname, "nickname"),
                        _ => (ContentCategory::Profile, "profile"),
                    };
                    dialog_counter += 1;
                    let unit = self.next_unit(
                        file,
                        format!("{prefix}/change_{kind}_{dialog_counter}"),
                        category,
                        text,
                    );
                    self.push(unit);
                }
            }

            if code == CODE_PLUGIN_COMMAND_MV {
                let cmd_str = param_str(cmd, 0);
                if let Some(text) = mv_plugin_display_text(cmd_str) {
                    if is_plugin_display_text(&text) {
                        dialog_counter += 1;
                        let unit = self.next_unit(
                            file,
                            format!("{prefix}/plugin_mv_{dialog_counter}"),
                            ContentCategory::PluginText,
                            text,
                        );
                        let mut unit = unit;
                        unit.raw_command = Some(cmd_str.to_string());
                        self.push(unit);
                    }
                }
            }

            if code == CODE_PLUGIN_COMMAND_MZ {
                let plugin_name = param_str(cmd, 0);
                if let Some(allowed_keys) = MZ_PLUGIN_WHITELIST.get(plugin_name) {
                    let arg_str = param_str(cmd, 3);
                    if let Ok(Value::Object(args)) = serde_json::from_str::<Value>(arg_str) {
                        for key in *allowed_keys {
                            let Some(val) = args.get(*key).and_then(Value::as_str) else {
                                continue;
                            };
                            if is_plugin_display_text(val) {
                                dialog_counter += 1;
                                let unit = self.next_unit(
                                    file,
                                    format!("{prefix}/plugin_mz_{dialog_counter}/{plugin_name}/{key}"),
                                    ContentCategory::PluginText,
                                    val,
                                );
                                self.push(unit);
                            }
                        }
                    }
                }
            }

            i += 1;
        }
    }
}

fn category_for_db_field(field: &str) -> ContentCategory {
    match field {
        "name" => ContentCategory::Name,
        "nickname" => ContentCategory::Nickname,
        "profile" => ContentCategory::Profile,
        "description" => ContentCategory::Description,
        _ => ContentCategory::Message,
    }
}

fn is_map_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.starts_with("map")
        && lower.ends_with(".json")
        && lower[3..lower.len() - 5].chars().all(|c| c.is_ascii_digit())
        && lower.len() > 8
}

fn read_data_json(path: &Path, file_name: &str) -> Result<Value> {
    let content = FileManager::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        CodecError::MalformedJson {
            file: file_name.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Load the actor registry from Actors.json, with gender auto-detection
fn load_actors(data_dir: &Path) -> Result<Vec<ActorRecord>> {
    let path = data_dir.join("Actors.json");
    if !FileManager::file_exists(&path) {
        return Ok(Vec::new());
    }
    let data = read_data_json(&path, "Actors.json")?;
    let Some(items) = data.as_array() else { return Ok(Vec::new()) };

    let mut actors = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else { continue };
        let name = obj.get("name").and_then(Value::as_str).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0) as u32;
        let profile = obj.get("profile").and_then(Value::as_str).unwrap_or("");
        let note = obj.get("note").and_then(Value::as_str).unwrap_or("");
        let nickname = obj.get("nickname").and_then(Value::as_str).unwrap_or("");
        actors.push(ActorRecord::detect(id, name, profile, note, nickname));
    }
    Ok(actors)
}

/// Extract every translatable unit from an RPG Maker MV/MZ project tree
pub fn extract_project(project_root: &Path) -> Result<ExtractionResult> {
    let data_dir = FileManager::find_data_dir(project_root).ok_or_else(|| {
        CodecError::DataDirNotFound(project_root.to_string_lossy().to_string())
    })?;
    let engine = FileManager::detect_engine(project_root);
    extract_data_dir(&data_dir, engine)
}

/// Extract from a specific data directory (the live one or a backup
/// snapshot), with the engine kind already detected
pub fn extract_data_dir(data_dir: &Path, engine: EngineKind) -> Result<ExtractionResult> {
    debug!("Data dir {:?}, engine {}", data_dir, engine.label());

    let actors = load_actors(data_dir)?;
    let actor_names: HashMap<u32, String> =
        actors.iter().map(|a| (a.id, a.name.clone())).collect();

    let mut extractor = Extractor::new(actor_names);
    extractor.parse_database_files(data_dir)?;
    let game_title = extractor.parse_system(data_dir)?;
    extractor.parse_common_events(data_dir)?;
    extractor.parse_troop_pages(data_dir)?;
    extractor.parse_maps(data_dir)?;

    let skipped = extractor
        .units
        .iter()
        .filter(|u| u.status == crate::project::UnitStatus::Skipped)
        .count();
    info!(
        "Extracted {} units ({} skipped placeholders, {} actors) from {:?}",
        extractor.units.len(),
        skipped,
        actors.len(),
        data_dir
    );
    if extractor.units.is_empty() {
        warn!("No translatable text found under {:?}", data_dir);
    }

    Ok(ExtractionResult {
        units: extractor.units,
        actors,
        game_title,
        engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cmd(code: u32, params: Value) -> Value {
        json!({"code": code, "indent": 0, "parameters": params})
    }

    fn extract_list(list: Vec<Value>) -> Vec<TranslationUnit> {
        let mut ex = Extractor::new(HashMap::from([(1, "リリィ".to_string())]));
        ex.extract_event_commands(&list, "Map001.json", "Ev1/p0");
        ex.units
    }

    #[test]
    fn test_extractEventCommands_consecutive401_shouldMergeIntoOneUnit() {
        let units = extract_list(vec![
            cmd(101, json!(["", 0, 0, 2])),
            cmd(401, json!(["ようこそ、"])),
            cmd(401, json!(["旅の人。"])),
        ]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source_text, "ようこそ、\n旅の人。");
        assert_eq!(units[0].segment_count, 2);
        assert_eq!(units[0].id.field_path, "Ev1/p0/dialog_1");
    }

    #[test]
    fn test_extractEventCommands_nonJapaneseBlock_shouldEmitSkippedPlaceholder() {
        let units = extract_list(vec![
            cmd(401, json!(["Hello."])),
            cmd(401, json!(["こんにちは。"])),
        ]);
        // Separate blocks would need a non-401 between them; this is one
        // run, so one unit, extractable because the second line has JP.
        assert_eq!(units.len(), 1);

        let units = extract_list(vec![
            cmd(401, json!(["Hello."])),
            cmd(0, json!([])),
            cmd(401, json!(["こんにちは。"])),
        ]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].status, crate::project::UnitStatus::Skipped);
        assert_eq!(units[1].id.field_path, "Ev1/p0/dialog_2");
    }

    #[test]
    fn test_extractEventCommands_nameboxPrefix_shouldSplitAndTrackSpeaker() {
        let units = extract_list(vec![cmd(401, json!(["\\N<夢魔>いらっしゃい。"]))]);
        // One speaker-name unit plus the dialogue unit
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].category, ContentCategory::SpeakerName);
        assert_eq!(units[0].source_text, "夢魔");
        assert_eq!(units[1].source_text, "いらっしゃい。");
        assert_eq!(units[1].namebox.as_deref(), Some("\\N<夢魔>"));
        assert_eq!(units[1].speaker.as_deref(), Some("夢魔"));
    }

    #[test]
    fn test_extractEventCommands_bareActorCode_shouldResolveSpeaker() {
        let units = extract_list(vec![cmd(401, json!(["\\n[1]おはよう。"]))]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].namebox.as_deref(), Some("\\n[1]"));
        assert_eq!(units[0].speaker.as_deref(), Some("リリィ"));
        assert_eq!(units[0].source_text, "おはよう。");
    }

    #[test]
    fn test_extractEventCommands_mzSpeaker_shouldDedupAcrossBlocks() {
        let list = vec![
            cmd(101, json!(["", 0, 0, 2, "夢魔"])),
            cmd(401, json!(["いらっしゃい。"])),
            cmd(101, json!(["", 0, 0, 2, "夢魔"])),
            cmd(401, json!(["また来たのね。"])),
        ];
        let units = extract_list(list);
        let speakers: Vec<_> = units
            .iter()
            .filter(|u| u.category == ContentCategory::SpeakerName)
            .collect();
        assert_eq!(speakers.len(), 1);
    }

    #[test]
    fn test_extractEventCommands_choices_shouldExtractJapaneseOnly() {
        let units = extract_list(vec![cmd(
            102,
            json!([["はい", "いいえ", "Cancel"], 0]),
        )]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].category, ContentCategory::Choice);
        assert_eq!(units[0].id.field_path, "Ev1/p0/choice_1_0");
        assert_eq!(units[1].id.field_path, "Ev1/p0/choice_2_1");
    }

    #[test]
    fn test_extractEventCommands_mvPlugin_shouldStoreRawCommand() {
        let units = extract_list(vec![cmd(356, json!(["ShowInfo 鍵を手に入れた"]))]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].category, ContentCategory::PluginText);
        assert_eq!(units[0].source_text, "鍵を手に入れた");
        assert_eq!(units[0].raw_command.as_deref(), Some("ShowInfo 鍵を手に入れた"));
    }

    #[test]
    fn test_extractEventCommands_mzPlugin_shouldUseKeyWhitelist() {
        let args = r#"{"message": "通知だよ", "icon": "item_01"}"#;
        let units = extract_list(vec![cmd(
            357,
            json!(["TorigoyaMZ_NotifyMessage", "notify", 0, args]),
        )]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source_text, "通知だよ");
        assert!(units[0].id.field_path.ends_with("TorigoyaMZ_NotifyMessage/message"));
    }

    #[test]
    fn test_isMapFile_shouldMatchNumberedMapsOnly() {
        assert!(is_map_file("Map001.json"));
        assert!(is_map_file("map042.json"));
        assert!(!is_map_file("MapInfos.json"));
        assert!(!is_map_file("Actors.json"));
    }

    #[test]
    fn test_extractProject_missingDataDir_shouldFail() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_project(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No data directory"));
    }
}
