/*!
 * Event command codes, field whitelists, and plugin command tables.
 *
 * RPG Maker data is a minefield: most strings are internal identifiers that
 * break the game if touched. Everything the codec extracts goes through the
 * whitelists in this module, mirroring the field lists and known-plugin
 * tables proven safe in practice.
 */

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils::has_japanese;

/// Show Text setup (face, position, MZ speaker name in params[4])
pub const CODE_SHOW_TEXT_HEADER: u32 = 101;
/// Show Text line, params[0] is the text
pub const CODE_SHOW_TEXT: u32 = 401;
/// Show Choices, params[0] is the option list
pub const CODE_SHOW_CHOICES: u32 = 102;
/// Scroll Text line, params[0] is the text
pub const CODE_SCROLL_TEXT: u32 = 405;
/// Change Actor Name, params[1] is the name
pub const CODE_CHANGE_NAME: u32 = 320;
/// Change Actor Nickname, params[1] is the nickname
pub const CODE_CHANGE_NICKNAME: u32 = 324;
/// Change Actor Profile, params[1] is the profile
pub const CODE_CHANGE_PROFILE: u32 = 325;
/// Plugin Command (MV), params[0] is the command string
pub const CODE_PLUGIN_COMMAND_MV: u32 = 356;
/// Plugin Command (MZ), params[0]=plugin, params[1]=command, params[3]=JSON args
pub const CODE_PLUGIN_COMMAND_MZ: u32 = 357;

/// Database files and their translatable fields
pub static DATABASE_FILES: &[(&str, &[&str])] = &[
    ("Actors.json", &["name", "nickname", "profile"]),
    ("Classes.json", &["name"]),
    ("Items.json", &["name", "description"]),
    ("Weapons.json", &["name", "description"]),
    ("Armors.json", &["name", "description"]),
    ("Skills.json", &["name", "description", "message1", "message2"]),
    ("States.json", &["name", "message1", "message2", "message3", "message4"]),
    ("Enemies.json", &["name"]),
    ("Troops.json", &["name"]),
];

/// Fields of a database file, if it is one
pub fn database_fields(file_name: &str) -> Option<&'static [&'static str]> {
    DATABASE_FILES
        .iter()
        .find(|(name, _)| *name == file_name)
        .map(|(_, fields)| *fields)
}

/// System.json type arrays shown in battle and equipment menus
pub static SYSTEM_TYPE_ARRAYS: &[&str] =
    &["elements", "skillTypes", "weaponTypes", "armorTypes", "equipTypes"];

/// MZ plugin commands: plugin name -> arg keys that hold display text.
/// Everything not listed stays untouched.
pub static MZ_PLUGIN_WHITELIST: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("LL_InfoPopupWIndow", &["messageText"]);
        m.insert("QuestSystem", &["DetailNote"]);
        m.insert("BalloonInBattle", &["text"]);
        m.insert("MNKR_CommonPopupCoreMZ", &["text"]);
        m.insert("DestinationWindow", &["destination"]);
        m.insert("_TMLogWindowMZ", &["text"]);
        m.insert("TorigoyaMZ_NotifyMessage", &["message"]);
        m.insert("SoR_GabWindow", &["arg1"]);
        m.insert("DarkPlasma_CharacterText", &["text"]);
        m.insert("DTextPicture", &["text"]);
        m.insert("TextPicture", &["text"]);
        m.insert("LogWindow", &["text"]);
        m.insert("BattleLogOutput", &["message"]);
        m.insert("TorigoyaMZ_NotifyMessage_CommandMessage", &["message"]);
        m.insert("NUUN_SaveScreen", &["AnyName"]);
        m.insert("build/ARPG_Core", &["Text", "SkillByName"]);
        m
    });

/// MV plugin commands: command prefix plus a regex whose first capture
/// group is the translatable text portion. First matching pattern wins.
pub static MV_PLUGIN_WHITELIST: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("D_TEXT", Regex::new(r"D_TEXT\s+(\S+)\s?\d*").unwrap()),
        ("Tachie showName", Regex::new(r"Tachie showName (.+)").unwrap()),
        ("ShowInfo", Regex::new(r"ShowInfo\s(.*)").unwrap()),
        ("PushGab", Regex::new(r"PushGab\s(.*)").unwrap()),
        ("addLog", Regex::new(r"addLog\s(.*)").unwrap()),
        ("DW_", Regex::new(r"DW_.*\s\d+\s(.+)").unwrap()),
        ("CommonPopup", Regex::new(r"CommonPopup\sadd\stext:(.*?)\\\}").unwrap()),
        ("AddCustomChoice", Regex::new(r"AddCustomChoice\s\d+\s(.+)\s\d").unwrap()),
        ("namePop", Regex::new(r"<namePop:\s*([^>]+)>").unwrap()),
        ("namePop", Regex::new(r"namePop\s*(?:-?\d+)?\s*([^\r\n<>]+)").unwrap()),
        (
            "LL_InfoPopupWIndowMV",
            Regex::new(r"LL_InfoPopupWIndowMV\sshowWindow\s(.+?) .+").unwrap(),
        ),
        (
            "OriginMenuStatus SetParam",
            Regex::new(r"OriginMenuStatus\sSetParam\sparam\d\s(.*)").unwrap(),
        ),
        (
            "LL_GalgeChoiceWindowMV setMessageText",
            Regex::new(r"LL_GalgeChoiceWindowMV setMessageText (.+)").unwrap(),
        ),
        (
            "LL_GalgeChoiceWindowMV setChoices",
            Regex::new(r"LL_GalgeChoiceWindowMV setChoices (.+)").unwrap(),
        ),
    ]
});

/// Extract the display-text portion of an MV plugin command, if the
/// command is whitelisted and the captured text passes the display filter.
pub fn mv_plugin_display_text(command: &str) -> Option<String> {
    for (prefix, pattern) in MV_PLUGIN_WHITELIST.iter() {
        if !command.starts_with(prefix) {
            continue;
        }
        if let Some(caps) = pattern.captures(command) {
            if let Some(text) = caps.get(1) {
                if !text.as_str().is_empty() && has_japanese(text.as_str()) {
                    return Some(text.as_str().to_string());
                }
            }
        }
    }
    None
}

/// Substitute translated text back into an MV plugin command, preserving
/// the command structure. Falls back to one direct substring replacement.
pub fn substitute_mv_plugin_text(command: &str, original: &str, translation: &str) -> String {
    for (prefix, pattern) in MV_PLUGIN_WHITELIST.iter() {
        if !command.starts_with(prefix) {
            continue;
        }
        if let Some(caps) = pattern.captures(command) {
            if let Some(m) = caps.get(1) {
                if m.as_str() == original {
                    let mut out = String::with_capacity(command.len() + translation.len());
                    out.push_str(&command[..m.start()]);
                    out.push_str(translation);
                    out.push_str(&command[m.end()..]);
                    return out;
                }
            }
        }
    }
    command.replacen(original, translation, 1)
}

static PLUGIN_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<[^>]+>$").unwrap());
static ASSET_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S*_\S*$").unwrap());
static FILE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]\w*[/\\]").unwrap());
static JS_SYNTAX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;{}()\[\]=]").unwrap());
static CSS_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{3,8}$").unwrap());
static EVAL_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(function|var |let |const |this\.|return |if\s*\()").unwrap());

/// Whether a plugin parameter value is likely display text rather than a
/// tag, asset id, file path, color code, or script snippet.
pub fn is_plugin_display_text(text: &str) -> bool {
    let stripped = text.trim();
    if !has_japanese(stripped) {
        return false;
    }
    if PLUGIN_TAG.is_match(stripped)
        || ASSET_ID.is_match(stripped)
        || FILE_PATH.is_match(stripped)
        || CSS_COLOR.is_match(stripped)
        || JS_SYNTAX.is_match(stripped)
        || EVAL_LIKE.is_match(stripped)
    {
        return false;
    }
    true
}

/// Namebox prefix at the start of a dialogue block: `\N<...>` or `\n<...>`
pub static NAMEBOX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\[Nn]<([^>]+)>").unwrap());

/// Actor code: `\n[1]`, `\N[2]`
pub static ACTOR_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\[Nn]\[(\d+)\]").unwrap());
