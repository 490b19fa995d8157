use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities for RPG Maker project trees

/// RPG Maker engine generation, detected from the project layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// RPG Maker MV (plugin commands as code 356)
    Mv,
    /// RPG Maker MZ (plugin commands as code 357)
    Mz,
}

impl EngineKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mv => "MV",
            Self::Mz => "MZ",
        }
    }
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Locate the data directory of an RPG Maker project. Checked in
    /// order: `data/`, `Data/`, `www/data/` (deployed MV projects).
    pub fn find_data_dir<P: AsRef<Path>>(project_root: P) -> Option<PathBuf> {
        let root = project_root.as_ref();
        for candidate in ["data", "Data", "www/data"] {
            let dir = root.join(candidate);
            if dir.is_dir() {
                return Some(dir);
            }
        }
        None
    }

    /// Detect the engine generation from the project layout.
    /// MZ projects ship a `js/rmmz_core.js`; MV projects a `js/rpg_core.js`
    /// (possibly under `www/`). Falls back to MV when neither is present.
    pub fn detect_engine<P: AsRef<Path>>(project_root: P) -> EngineKind {
        let root = project_root.as_ref();
        for base in ["", "www"] {
            let js = root.join(base).join("js");
            if js.join("rmmz_core.js").is_file() {
                return EngineKind::Mz;
            }
            if js.join("rpg_core.js").is_file() {
                return EngineKind::Mv;
            }
        }
        EngineKind::Mv
    }

    /// List the JSON data files directly inside a data directory,
    /// sorted by file name for deterministic extraction order.
    pub fn list_data_files<P: AsRef<Path>>(data_dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        for entry in WalkDir::new(data_dir.as_ref()).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            {
                result.push(path.to_path_buf());
            }
        }
        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read and parse a JSON data file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Value> {
        let content = Self::read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON: {:?}", path.as_ref()))
    }

    /// Write a JSON value to a file atomically: serialize to a temp file
    /// in the same directory, then rename over the destination. A crash
    /// mid-write never leaves a truncated data file behind.
    pub fn write_json_atomic<P: AsRef<Path>>(path: P, value: &Value) -> Result<()> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::ensure_dir(dir)?;

        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize JSON for {:?}", path))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write JSON for {:?}", path))?;
        tmp.persist(path)
            .with_context(|| format!("Failed to persist {:?}", path))?;
        Ok(())
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }
        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Copy a file, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();
        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }
        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }
}
