/*!
 * Structured text codec for RPG Maker MV/MZ data trees.
 *
 * `extract` turns a project's JSON files into a flat ordered list of
 * translation units; `write` applies translated units back into the tree
 * without disturbing anything else. `commands` holds the shared command
 * codes and whitelists both directions rely on.
 */

pub mod commands;
pub mod extract;
pub mod write;

pub use extract::{extract_data_dir, extract_project, ExtractionResult};
pub use write::{apply_state, apply_to_value, ApplyStats};
