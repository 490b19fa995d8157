/*!
 * Backup snapshot of the original data directory.
 *
 * The first export copies `data/` to a `data_original/` sibling. Every
 * later export reads structure from the snapshot and writes into the live
 * directory, so exports can be repeated and reverted at any time.
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use walkdir::WalkDir;

use crate::file_utils::FileManager;

/// Path of the snapshot directory for a data directory
pub fn backup_dir_for(data_dir: &Path) -> PathBuf {
    let mut name = data_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "data".to_string());
    name.push_str("_original");
    data_dir.with_file_name(name)
}

/// Create the snapshot if it does not exist yet. Returns the snapshot
/// path. An existing snapshot is never overwritten; it stays the pristine
/// source-language tree.
pub fn ensure_backup(data_dir: &Path) -> Result<PathBuf> {
    let backup_dir = backup_dir_for(data_dir);
    if FileManager::dir_exists(&backup_dir) {
        return Ok(backup_dir);
    }

    let mut copied = 0usize;
    for entry in WalkDir::new(data_dir) {
        let entry = entry.context("Failed to read data directory entry")?;
        let rel = entry
            .path()
            .strip_prefix(data_dir)
            .context("Backup entry outside data directory")?;
        let target = backup_dir.join(rel);
        if entry.file_type().is_dir() {
            FileManager::ensure_dir(&target)?;
        } else {
            FileManager::copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }
    info!("Created backup snapshot {:?} ({} files)", backup_dir, copied);
    Ok(backup_dir)
}

/// The directory exports should read structure from: the snapshot when it
/// exists, the live directory otherwise.
pub fn source_dir_for(data_dir: &Path) -> PathBuf {
    let backup_dir = backup_dir_for(data_dir);
    if FileManager::dir_exists(&backup_dir) {
        backup_dir
    } else {
        data_dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_backupDirFor_shouldAppendOriginalSuffix() {
        assert_eq!(
            backup_dir_for(Path::new("/game/www/data")),
            PathBuf::from("/game/www/data_original")
        );
    }

    #[test]
    fn test_ensureBackup_firstCall_shouldCopyTree() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("Map001.json"), "{}").unwrap();

        let backup = ensure_backup(&data).unwrap();
        assert!(backup.join("Map001.json").exists());
    }

    #[test]
    fn test_ensureBackup_existingSnapshot_shouldNotOverwrite() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("Map001.json"), "translated").unwrap();
        let backup = dir.path().join("data_original");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("Map001.json"), "original").unwrap();

        ensure_backup(&data).unwrap();
        let content = fs::read_to_string(backup.join("Map001.json")).unwrap();
        assert_eq!(content, "original");
    }

    #[test]
    fn test_sourceDirFor_shouldPreferSnapshot() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(&data).unwrap();
        assert_eq!(source_dir_for(&data), data);
        fs::create_dir_all(dir.path().join("data_original")).unwrap();
        assert_eq!(source_dir_for(&data), dir.path().join("data_original"));
    }
}
