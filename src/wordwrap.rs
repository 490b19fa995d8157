/*!
 * Word wrap post-processing for translated message text.
 *
 * Japanese source text is pre-broken for the message window, but English
 * translations run long and RPG Maker does not wrap by itself. This pass
 * re-flows translated dialogue to a visual line width, measuring length
 * with control sequences stripped so `\C[2]` and friends cost nothing.
 */

use log::warn;

use crate::app_config::WordWrapConfig;
use crate::placeholder::strip_control_sequences;
use crate::project::ProjectState;

/// Result of wrapping one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapOutcome {
    /// Re-flowed text
    pub text: String,
    /// Number of lines after wrapping
    pub lines: usize,
    /// Whether the result exceeds the message-box line budget
    pub overflowed: bool,
}

/// Summary of a whole-project wrap pass
#[derive(Debug, Clone, Default)]
pub struct WrapReport {
    /// Units whose text changed
    pub wrapped: usize,
    /// Units exceeding the line budget after wrapping
    pub overflowing: Vec<String>,
}

/// Visual length of one line: characters with control sequences stripped
pub fn visual_length(text: &str) -> usize {
    strip_control_sequences(text).chars().count()
}

/// Re-flow text to the configured width. Existing line breaks are treated
/// as soft and the text re-wraps as one stream; words longer than a full
/// line are split hard.
pub fn wrap(text: &str, config: &WordWrapConfig) -> WrapOutcome {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in words {
        let word_len = visual_length(word);
        let current_len = visual_length(&current);

        if current.is_empty() {
            current = word.to_string();
        } else if current_len + 1 + word_len <= config.chars_per_line {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }

        // Hard-split a word that cannot fit a line on its own
        while visual_length(&current) > config.chars_per_line {
            let split_at = current
                .char_indices()
                .nth(config.chars_per_line)
                .map(|(i, _)| i)
                .unwrap_or(current.len());
            let rest = current.split_off(split_at);
            lines.push(std::mem::take(&mut current));
            current = rest;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let line_count = lines.len().max(1);
    WrapOutcome {
        text: lines.join("\n"),
        lines: line_count,
        overflowed: line_count > config.max_lines,
    }
}

/// Wrap every translated dialogue and scroll unit in the project.
/// Non-wrappable categories (names, terms, choices) are left alone.
pub fn wrap_project(state: &mut ProjectState, config: &WordWrapConfig) -> WrapReport {
    let mut report = WrapReport::default();
    for unit in &mut state.units {
        if !unit.category.is_wrappable() {
            continue;
        }
        let Some(translation) = unit.translated_text.as_deref() else {
            continue;
        };
        let outcome = wrap(translation, config);
        if outcome.overflowed {
            warn!(
                "Unit {} wraps to {} lines (budget {})",
                unit.id, outcome.lines, config.max_lines
            );
            report.overflowing.push(unit.id.to_string());
        }
        if outcome.text != translation {
            unit.translated_text = Some(outcome.text);
            report.wrapped += 1;
        }
    }
    report
}
