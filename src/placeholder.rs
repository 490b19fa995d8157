/*!
 * Control-sequence masking for message text.
 *
 * RPG Maker message text is riddled with engine escape codes (`\N[2]`,
 * `\C[4]`, `\G`, `\{`, ...) and inline tags that must survive translation
 * byte-for-byte. Before a unit is sent to a provider every such sequence is
 * replaced with an opaque numbered token, and after translation the tokens
 * are swapped back. Tokens the model dropped are re-inserted
 * deterministically and reported so the caller can log the repair.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// All engine escape codes and inline tags that must be preserved.
///
/// Covers: icon/name/variable/color/party codes with an index
/// (`\I[n] \N[n] \n[n] \V[n] \C[n] \P[n] \FS[n]`), bare control codes
/// (`\G \{ \} \$ \. \| \! \> \< \^`), and single-line `<...>` tags
/// (ruby text, namebox plugins, note-style tags).
static CONTROL_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:FS\[\d+\]|[NnPpVvCcIi]\[\d+\]|[G{}$.|!><^])|<[^<>\r\n]+>").unwrap()
});

/// Numbered token left in masked text: `⟦0⟧`, `⟦1⟧`, ...
static MASK_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"⟦(\d+)⟧").unwrap());

/// Ordered table of sequences masked out of one unit. Token number N
/// maps to the Nth entry.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderMap {
    entries: Vec<String>,
}

impl PlaceholderMap {
    /// Number of masked sequences
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was masked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Original sequence for a token number
    pub fn sequence(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }
}

/// Result of restoring tokens into a translated string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmaskOutcome {
    /// Restored text, with dropped tokens repaired
    pub text: String,
    /// Token numbers the translation dropped (repaired deterministically)
    pub missing: Vec<usize>,
    /// Token numbers in the translation that had no table entry (removed)
    pub unknown: Vec<usize>,
}

impl UnmaskOutcome {
    /// Whether the translation preserved every token exactly
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty()
    }
}

/// Replace every control sequence in `text` with a numbered token.
/// Repeated occurrences of the same sequence get distinct tokens so the
/// restore stays positional.
pub fn mask(text: &str) -> (String, PlaceholderMap) {
    let mut entries = Vec::new();
    let masked = CONTROL_SEQUENCE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let index = entries.len();
            entries.push(caps[0].to_string());
            format!("⟦{index}⟧")
        })
        .into_owned();
    (masked, PlaceholderMap { entries })
}

/// Whether text contains any engine control sequence
pub fn has_control_sequences(text: &str) -> bool {
    CONTROL_SEQUENCE.is_match(text)
}

/// Strip control sequences entirely. Used for visual-length measurement
/// (word wrap) and for display-text heuristics.
pub fn strip_control_sequences(text: &str) -> String {
    CONTROL_SEQUENCE.replace_all(text, "").into_owned()
}

/// Restore masked tokens in a translated string.
///
/// Tokens present in the translation are replaced with their original
/// sequence. Tokens the model dropped are re-inserted at the position
/// their numbering implies: token N goes directly after token N-1's
/// restored sequence, token 0 at the text start. Repairing in ascending
/// token order keeps the original relative order of the sequences even
/// when several are missing. Tokens with numbers outside the table are
/// removed.
pub fn unmask(translated: &str, map: &PlaceholderMap) -> UnmaskOutcome {
    // Byte offset of each restored sequence's end, once known
    let mut end_of: Vec<Option<usize>> = vec![None; map.entries.len()];
    let mut unknown = Vec::new();

    let mut text = String::with_capacity(translated.len());
    let mut tail = 0;
    for caps in MASK_TOKEN.captures_iter(translated) {
        let m = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        text.push_str(&translated[tail..m.0]);
        tail = m.1;

        let index: usize = caps[1].parse().unwrap_or(usize::MAX);
        match map.entries.get(index) {
            Some(sequence) => {
                text.push_str(sequence);
                end_of[index] = Some(text.len());
            }
            None => unknown.push(index),
        }
    }
    text.push_str(&translated[tail..]);

    let missing: Vec<usize> = end_of
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_none())
        .map(|(i, _)| i)
        .collect();

    for &index in &missing {
        let sequence = &map.entries[index];
        let at = match index {
            0 => 0,
            _ => end_of[index - 1].unwrap_or(0),
        };
        text.insert_str(at, sequence);
        for end in end_of.iter_mut().flatten() {
            if *end > at {
                *end += sequence.len();
            }
        }
        end_of[index] = Some(at + sequence.len());
    }

    UnmaskOutcome { text, missing, unknown }
}
