/*!
 * Write-back: translated units -> game data tree.
 *
 * Exports always read structure from the pristine source tree (the backup
 * snapshot) and write into the live data directory, so repeated exports
 * stay idempotent. Event text is applied in a single pass per file: blocks
 * are keyed by their first original line and matched against consecutive
 * 401/405 runs, everything else is addressed directly by field path.
 *
 * Translations never change a file's command structure. A translation with
 * fewer lines than the original block is padded with empty segments; one
 * with more lines has the excess folded into the final segment.
 */

use std::collections::{HashMap, VecDeque};
use std::path::Path;

use anyhow::Result;
use log::{info, warn};
use serde_json::Value;

use crate::codec::commands::{
    database_fields, substitute_mv_plugin_text, ACTOR_CODE, CODE_CHANGE_NAME,
    CODE_CHANGE_NICKNAME, CODE_CHANGE_PROFILE, CODE_PLUGIN_COMMAND_MV, CODE_PLUGIN_COMMAND_MZ,
    CODE_SCROLL_TEXT, CODE_SHOW_CHOICES, CODE_SHOW_TEXT, CODE_SHOW_TEXT_HEADER, NAMEBOX,
    SYSTEM_TYPE_ARRAYS,
};
use crate::errors::CodecError;
use crate::file_utils::FileManager;
use crate::project::{ContentCategory, ProjectState, TranslationUnit, UnitId};

/// Outcome of one export run
#[derive(Debug, Clone, Default)]
pub struct ApplyStats {
    /// Units successfully written back
    pub applied: usize,
    /// Data files rewritten
    pub files_written: usize,
    /// Units whose location could not be found in the source tree
    pub missing: Vec<UnitId>,
}

fn cmd_code(cmd: &Value) -> u32 {
    cmd.get("code").and_then(Value::as_u64).unwrap_or(0) as u32
}

fn param_str(cmd: &Value, index: usize) -> String {
    cmd.get("parameters")
        .and_then(Value::as_array)
        .and_then(|p| p.get(index))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn set_param(cmd: &mut Value, index: usize, text: &str) {
    if let Some(params) = cmd.get_mut("parameters").and_then(Value::as_array_mut) {
        if index < params.len() {
            params[index] = Value::String(text.to_string());
        }
    }
}

/// Fit translated lines to the original segment count: pad short
/// translations with empty segments, fold overflow into the last one.
fn fit_segments(translation: &str, segment_count: usize, id: &UnitId) -> Vec<String> {
    let mut lines: Vec<String> = translation.split('\n').map(str::to_string).collect();
    while lines.len() < segment_count {
        lines.push(String::new());
    }
    if lines.len() > segment_count {
        warn!(
            "Unit {} translation has {} lines for {} segments, folding overflow",
            id,
            lines.len(),
            segment_count
        );
        let overflow = lines.split_off(segment_count - 1);
        lines.push(overflow.join(" "));
    }
    lines
}

/// Translate the name inside a namebox prefix. Actor codes (`\N<\n[1]>`)
/// resolve at runtime and pass through untouched.
fn translate_namebox(namebox: &str, speakers: &HashMap<String, String>) -> String {
    if let Some(caps) = NAMEBOX.captures(namebox) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if !ACTOR_CODE.is_match(inner) {
            if let Some(translated) = speakers.get(inner) {
                let m = caps.get(1).unwrap();
                let mut out = String::new();
                out.push_str(&namebox[..m.start()]);
                out.push_str(translated);
                out.push_str(&namebox[m.end()..]);
                return out;
            }
        }
    }
    namebox.to_string()
}

/// One pending block replacement, keyed by its first original line
struct BlockPatch {
    id: UnitId,
    code: u32,
    orig_lines: Vec<String>,
    trans_lines: Vec<String>,
}

/// All pending replacements for one file
struct FilePatches {
    blocks: HashMap<String, VecDeque<BlockPatch>>,
    choices: HashMap<String, VecDeque<(String, UnitId)>>,
    applied: usize,
    missing: Vec<UnitId>,
}

impl FilePatches {
    fn build(units: &[&TranslationUnit], speakers: &HashMap<String, String>) -> (Self, Vec<UnitId>) {
        let mut patches = FilePatches {
            blocks: HashMap::new(),
            choices: HashMap::new(),
            applied: 0,
            missing: Vec::new(),
        };
        let mut direct = Vec::new();

        for unit in units {
            let Some(translation) = unit.translated_text.as_deref() else {
                continue;
            };
            match unit.category {
                ContentCategory::Dialogue | ContentCategory::ScrollText => {
                    let code = if unit.category == ContentCategory::Dialogue {
                        CODE_SHOW_TEXT
                    } else {
                        CODE_SCROLL_TEXT
                    };
                    let mut orig_lines: Vec<String> =
                        unit.source_text.split('\n').map(str::to_string).collect();
                    let mut trans_lines = fit_segments(translation, unit.segment_count, &unit.id);
                    // The raw 401 text still carries the namebox prefix
                    if let Some(namebox) = &unit.namebox {
                        orig_lines[0] = format!("{}{}", namebox, orig_lines[0]);
                        trans_lines[0] =
                            format!("{}{}", translate_namebox(namebox, speakers), trans_lines[0]);
                    }
                    let first = orig_lines[0].clone();
                    patches.blocks.entry(first).or_default().push_back(BlockPatch {
                        id: unit.id.clone(),
                        code,
                        orig_lines,
                        trans_lines,
                    });
                }
                ContentCategory::Choice => {
                    patches
                        .choices
                        .entry(unit.source_text.clone())
                        .or_default()
                        .push_back((translation.to_string(), unit.id.clone()));
                }
                _ => direct.push(unit.id.clone()),
            }
        }
        (patches, direct)
    }

    /// Walk one command list, applying speaker, block, and choice patches
    fn process_commands(&mut self, cmd_list: &mut Vec<Value>, speakers: &HashMap<String, String>) {
        let mut i = 0;
        while i < cmd_list.len() {
            let code = cmd_code(&cmd_list[i]);

            if code == CODE_SHOW_TEXT_HEADER && !speakers.is_empty() {
                let name = param_str(&cmd_list[i], 4);
                if let Some(translated) = speakers.get(&name) {
                    set_param(&mut cmd_list[i], 4, translated);
                    self.applied += 1;
                }
                i += 1;
                continue;
            }

            if (code == CODE_SHOW_TEXT || code == CODE_SCROLL_TEXT) && !self.blocks.is_empty() {
                let first_text = param_str(&cmd_list[i], 0);
                let mut advance = 1;
                if let Some(candidates) = self.blocks.get_mut(&first_text) {
                    let mut matched_idx = None;
                    for (idx, patch) in candidates.iter().enumerate() {
                        if patch.code != code || i + patch.orig_lines.len() > cmd_list.len() {
                            continue;
                        }
                        let matches = patch.orig_lines.iter().enumerate().all(|(j, line)| {
                            let c = &cmd_list[i + j];
                            cmd_code(c) == code && param_str(c, 0) == *line
                        });
                        if matches {
                            matched_idx = Some(idx);
                            break;
                        }
                    }
                    if let Some(idx) = matched_idx {
                        let patch = candidates.remove(idx).unwrap();
                        for (j, line) in patch.trans_lines.iter().enumerate() {
                            set_param(&mut cmd_list[i + j], 0, line);
                        }
                        advance = patch.orig_lines.len();
                        self.applied += 1;
                        if candidates.is_empty() {
                            self.blocks.remove(&first_text);
                        }
                    }
                }
                i += advance;
                continue;
            }

            if code == CODE_SHOW_CHOICES && !self.choices.is_empty() {
                if let Some(options) = cmd_list[i]
                    .get_mut("parameters")
                    .and_then(Value::as_array_mut)
                    .and_then(|p| p.first_mut())
                    .and_then(Value::as_array_mut)
                {
                    for option in options.iter_mut() {
                        let Some(text) = option.as_str().map(str::to_string) else {
                            continue;
                        };
                        if let Some(queue) = self.choices.get_mut(&text) {
                            if let Some((translation, _)) = queue.pop_front() {
                                *option = Value::String(translation);
                                self.applied += 1;
                            }
                            if queue.is_empty() {
                                self.choices.remove(&text);
                            }
                        }
                    }
                }
            }

            i += 1;
        }
    }

    fn collect_leftovers(&mut self) {
        for queue in self.blocks.values() {
            for patch in queue {
                self.missing.push(patch.id.clone());
            }
        }
        for queue in self.choices.values() {
            for (_, id) in queue {
                self.missing.push(id.clone());
            }
        }
        self.blocks.clear();
        self.choices.clear();
    }
}

/// Visit every event command list in a data file. Handles maps (dict with
/// events -> pages), CommonEvents (array with `list`), and Troops (array
/// with `pages`).
fn walk_command_lists(data: &mut Value, f: &mut dyn FnMut(&mut Vec<Value>)) {
    match data {
        Value::Object(obj) => {
            if let Some(events) = obj.get_mut("events").and_then(Value::as_array_mut) {
                for event in events {
                    let Some(pages) = event.get_mut("pages").and_then(Value::as_array_mut) else {
                        continue;
                    };
                    for page in pages {
                        if let Some(list) = page.get_mut("list").and_then(Value::as_array_mut) {
                            f(list);
                        }
                    }
                }
            }
            if let Some(list) = obj.get_mut("list").and_then(Value::as_array_mut) {
                f(list);
            }
        }
        Value::Array(items) => {
            for item in items {
                if let Some(list) = item.get_mut("list").and_then(Value::as_array_mut) {
                    f(list);
                }
                if let Some(pages) = item.get_mut("pages").and_then(Value::as_array_mut) {
                    for page in pages {
                        if let Some(list) = page.get_mut("list").and_then(Value::as_array_mut) {
                            f(list);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Replace a single parameter on the first command matching `code` whose
/// parameter equals `original`. Returns whether a replacement happened.
fn replace_single_param(
    data: &mut Value,
    code: u32,
    param_idx: usize,
    original: &str,
    translation: &str,
) -> bool {
    let mut done = false;
    walk_command_lists(data, &mut |cmd_list| {
        if done {
            return;
        }
        for cmd in cmd_list.iter_mut() {
            if cmd_code(cmd) == code && param_str(cmd, param_idx) == original {
                set_param(cmd, param_idx, translation);
                done = true;
                return;
            }
        }
    });
    done
}

/// Replace one value inside an MZ plugin command's JSON argument blob
fn replace_mz_plugin_param(
    data: &mut Value,
    plugin_name: &str,
    param_key: &str,
    original: &str,
    translation: &str,
) -> bool {
    let mut done = false;
    walk_command_lists(data, &mut |cmd_list| {
        if done {
            return;
        }
        for cmd in cmd_list.iter_mut() {
            if cmd_code(cmd) != CODE_PLUGIN_COMMAND_MZ || param_str(cmd, 0) != plugin_name {
                continue;
            }
            let arg_str = param_str(cmd, 3);
            let Ok(Value::Object(mut args)) = serde_json::from_str::<Value>(&arg_str) else {
                continue;
            };
            if args.get(param_key).and_then(Value::as_str) == Some(original) {
                args.insert(param_key.to_string(), Value::String(translation.to_string()));
                if let Ok(serialized) = serde_json::to_string(&Value::Object(args)) {
                    set_param(cmd, 3, &serialized);
                    done = true;
                    return;
                }
            }
        }
    });
    done
}

/// Apply a directly-addressed unit (database, System.json, displayName,
/// change-actor commands, plugin commands). Returns whether it landed.
fn apply_direct(data: &mut Value, unit: &TranslationUnit) -> bool {
    let Some(translation) = unit.translated_text.as_deref() else {
        return false;
    };
    let file = unit.id.file_id.as_str();
    let parts: Vec<&str> = unit.id.field_path.split('/').collect();

    // Database entries: "<item_id>/<field>"
    if database_fields(file).is_some() && parts.len() == 2 {
        if let Ok(item_id) = parts[0].parse::<u64>() {
            let field = parts[1];
            if let Some(items) = data.as_array_mut() {
                for item in items {
                    let Some(obj) = item.as_object_mut() else { continue };
                    if obj.get("id").and_then(Value::as_u64) == Some(item_id) {
                        if obj.contains_key(field) {
                            obj.insert(field.to_string(), Value::String(translation.to_string()));
                            return true;
                        }
                        return false;
                    }
                }
            }
        }
        return false;
    }

    if file == "System.json" {
        return apply_system(data, &parts, translation);
    }

    if unit.id.field_path == "displayName" {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("displayName".to_string(), Value::String(translation.to_string()));
            return true;
        }
        return false;
    }

    // Change Actor Name/Nickname/Profile from events
    if parts.iter().any(|p| p.starts_with("change_name_")) {
        return replace_single_param(data, CODE_CHANGE_NAME, 1, &unit.source_text, translation);
    }
    if parts.iter().any(|p| p.starts_with("change_nickname_")) {
        return replace_single_param(data, CODE_CHANGE_NICKNAME, 1, &unit.source_text, translation);
    }
    if parts.iter().any(|p| p.starts_with("change_profile_")) {
        return replace_single_param(data, CODE_CHANGE_PROFILE, 1, &unit.source_text, translation);
    }

    // MV plugin command: rebuild the full command string
    if parts.iter().any(|p| p.starts_with("plugin_mv_")) {
        if let Some(raw) = &unit.raw_command {
            let new_cmd = substitute_mv_plugin_text(raw, &unit.source_text, translation);
            return replace_single_param(data, CODE_PLUGIN_COMMAND_MV, 0, raw, &new_cmd);
        }
        return false;
    }

    // MZ plugin command: ".../plugin_mz_N/<plugin>/<key>"
    if parts.len() >= 2 && parts.iter().any(|p| p.starts_with("plugin_mz_")) {
        let key = parts[parts.len() - 1];
        let plugin = parts[parts.len() - 2];
        return replace_mz_plugin_param(data, plugin, key, &unit.source_text, translation);
    }

    false
}

/// System.json field-path application
fn apply_system(data: &mut Value, parts: &[&str], translation: &str) -> bool {
    let Some(obj) = data.as_object_mut() else { return false };

    match parts {
        ["gameTitle"] => {
            obj.insert("gameTitle".to_string(), Value::String(translation.to_string()));
            true
        }
        ["terms", "messages", key] => {
            let Some(messages) = obj.get_mut("terms").and_then(|t| t.get_mut("messages")) else {
                return false;
            };
            match messages {
                Value::Array(arr) => set_array_index(arr, key, translation),
                Value::Object(map) => {
                    if map.contains_key(*key) {
                        map.insert(key.to_string(), Value::String(translation.to_string()));
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        }
        ["terms", table, index] => obj
            .get_mut("terms")
            .and_then(|t| t.get_mut(*table))
            .and_then(Value::as_array_mut)
            .is_some_and(|arr| set_array_index(arr, index, translation)),
        [array, index] if SYSTEM_TYPE_ARRAYS.contains(array) => obj
            .get_mut(*array)
            .and_then(Value::as_array_mut)
            .is_some_and(|arr| set_array_index(arr, index, translation)),
        _ => false,
    }
}

fn set_array_index(arr: &mut [Value], index: &str, translation: &str) -> bool {
    let Ok(idx) = index.parse::<usize>() else { return false };
    if idx < arr.len() {
        arr[idx] = Value::String(translation.to_string());
        true
    } else {
        false
    }
}

/// Apply every exportable unit of one file into its loaded JSON value
pub fn apply_to_value(
    data: &mut Value,
    units: &[&TranslationUnit],
    speakers: &HashMap<String, String>,
) -> ApplyStats {
    let (mut scan, direct_ids) = FilePatches::build(units, speakers);

    walk_command_lists(data, &mut |cmd_list| {
        scan.process_commands(cmd_list, speakers);
    });
    scan.collect_leftovers();

    let mut stats = ApplyStats {
        applied: scan.applied,
        files_written: 0,
        missing: scan.missing,
    };

    for id in direct_ids {
        let Some(unit) = units.iter().find(|u| u.id == id) else { continue };
        if apply_direct(data, unit) {
            stats.applied += 1;
        } else {
            warn!("Export: unit {} not found in source tree", id);
            stats.missing.push(id);
        }
    }
    stats
}

/// Export the project state into the live data directory, reading the
/// structure from `source_dir` (normally the backup snapshot).
///
/// In strict mode any unit whose location cannot be resolved fails the
/// export with a structural-mismatch error; otherwise missing units are
/// reported in the stats and logged.
pub fn apply_state(
    data_dir: &Path,
    source_dir: &Path,
    state: &ProjectState,
    strict: bool,
) -> Result<ApplyStats> {
    let mut speakers: HashMap<String, String> = HashMap::new();
    let mut by_file: HashMap<String, Vec<&TranslationUnit>> = HashMap::new();

    for unit in &state.units {
        if !unit.status.is_done() || unit.translated_text.is_none() {
            continue;
        }
        if unit.category == ContentCategory::SpeakerName {
            speakers.insert(
                unit.source_text.clone(),
                unit.translated_text.clone().unwrap_or_default(),
            );
        } else {
            by_file.entry(unit.id.file_id.clone()).or_default().push(unit);
        }
    }

    let mut stats = ApplyStats::default();
    let source_files = FileManager::list_data_files(source_dir)?;
    let source_names: Vec<String> = source_files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    // A state file referencing data files absent from the snapshot means
    // the snapshot is stale
    for (file, file_units) in &by_file {
        if !source_names.iter().any(|n| n == file) {
            if strict {
                return Err(CodecError::BackupFileMissing(file.clone()).into());
            }
            warn!("Export: source tree is missing {}", file);
            stats.missing.extend(file_units.iter().map(|u| u.id.clone()));
        }
    }

    for path in &source_files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_units = by_file.get(&file_name).map(Vec::as_slice).unwrap_or(&[]);
        if file_units.is_empty() && speakers.is_empty() {
            continue;
        }

        let mut data = FileManager::read_json(path)?;
        let file_stats = apply_to_value(&mut data, file_units, &speakers);

        if strict {
            if let Some(id) = file_stats.missing.first() {
                return Err(CodecError::StructuralMismatch(id.clone()).into());
            }
        }
        stats.missing.extend(file_stats.missing);

        if file_stats.applied > 0 {
            FileManager::write_json_atomic(data_dir.join(&file_name), &data)?;
            stats.files_written += 1;
            stats.applied += file_stats.applied;
        }
    }

    info!(
        "Export: applied {} units across {} files ({} missing)",
        stats.applied,
        stats.files_written,
        stats.missing.len()
    );
    Ok(stats)
}
