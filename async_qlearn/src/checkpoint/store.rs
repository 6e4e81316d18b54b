//! Checkpoint persistence backends.
//!
//! A checkpoint is an opaque model blob plus the global frame count at save
//! time. [`FileCheckpointStore`] keeps each one as a pair of files:
//!
//! ```text
//! checkpoint_000000080000.bin    model blob
//! checkpoint_000000080000.json   metadata (format version, frame, blob length)
//! ```
//!
//! The metadata file is written last via rename and is what `list` scans
//! for, so a save interrupted halfway never shows up as a checkpoint.

use crate::error::CheckpointError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Metadata format written by this version.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

const PREFIX: &str = "checkpoint_";

/// Metadata stored next to every blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub format_version: u32,
    pub frame: u64,
    pub blob_len: u64,
    pub saved_at_unix_secs: u64,
}

/// Location of a stored checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    /// Global frame count at save time.
    pub frame: u64,
    /// Path of the metadata file.
    pub path: PathBuf,
}

/// A loaded checkpoint.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub meta: CheckpointMeta,
    pub blob: Vec<u8>,
}

impl Checkpoint {
    pub fn frame(&self) -> u64 {
        self.meta.frame
    }
}

/// Save/load/list/prune of named checkpoint blobs.
pub trait CheckpointStore: Send {
    /// Persist `blob` as the checkpoint of `frame`.
    fn save(&mut self, frame: u64, blob: &[u8]) -> Result<CheckpointInfo, CheckpointError>;

    /// All stored checkpoints, oldest (lowest frame) first.
    fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError>;

    fn load(&self, info: &CheckpointInfo) -> Result<Checkpoint, CheckpointError>;

    fn remove(&mut self, info: &CheckpointInfo) -> Result<(), CheckpointError>;

    /// Most recent checkpoint, if any.
    fn latest(&self) -> Result<Option<CheckpointInfo>, CheckpointError> {
        Ok(self.list()?.pop())
    }
}

/// Directory-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Open a store, creating the directory if it doesn't exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stem(frame: u64) -> String {
        format!("{PREFIX}{frame:012}")
    }

    fn meta_path(&self, frame: u64) -> PathBuf {
        self.dir.join(format!("{}.json", Self::stem(frame)))
    }

    fn blob_path(&self, frame: u64) -> PathBuf {
        self.dir.join(format!("{}.bin", Self::stem(frame)))
    }

    fn frame_from_name(name: &str) -> Option<u64> {
        name.strip_prefix(PREFIX)?.strip_suffix(".json")?.parse().ok()
    }

    fn read_meta(path: &Path) -> Result<CheckpointMeta, CheckpointError> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| CheckpointError::Metadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, frame: u64, blob: &[u8]) -> Result<CheckpointInfo, CheckpointError> {
        fs::write(self.blob_path(frame), blob)?;

        let meta = CheckpointMeta {
            format_version: CHECKPOINT_FORMAT_VERSION,
            frame,
            blob_len: blob.len() as u64,
            saved_at_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let path = self.meta_path(frame);
        let text = serde_json::to_string_pretty(&meta).map_err(|e| CheckpointError::Metadata {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;

        Ok(CheckpointInfo { frame, path })
    }

    fn list(&self) -> Result<Vec<CheckpointInfo>, CheckpointError> {
        let mut checkpoints: Vec<CheckpointInfo> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                let frame = Self::frame_from_name(path.file_name()?.to_str()?)?;
                Some(CheckpointInfo { frame, path })
            })
            .collect();

        checkpoints.sort_by_key(|c| c.frame);
        Ok(checkpoints)
    }

    fn load(&self, info: &CheckpointInfo) -> Result<Checkpoint, CheckpointError> {
        if !info.path.exists() {
            return Err(CheckpointError::NotFound(info.frame));
        }
        let meta = Self::read_meta(&info.path)?;
        if meta.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(CheckpointError::FormatVersion {
                found: meta.format_version,
                expected: CHECKPOINT_FORMAT_VERSION,
            });
        }
        if meta.frame != info.frame {
            return Err(CheckpointError::Metadata {
                path: info.path.clone(),
                reason: format!(
                    "metadata frame {} does not match file name frame {}",
                    meta.frame, info.frame
                ),
            });
        }

        let blob = fs::read(self.blob_path(info.frame))?;
        if blob.len() as u64 != meta.blob_len {
            return Err(CheckpointError::Metadata {
                path: info.path.clone(),
                reason: format!("blob is {} bytes, metadata says {}", blob.len(), meta.blob_len),
            });
        }
        Ok(Checkpoint { meta, blob })
    }

    fn remove(&mut self, info: &CheckpointInfo) -> Result<(), CheckpointError> {
        // Metadata first: once it is gone the checkpoint is no longer listed.
        fs::remove_file(&info.path)?;
        match fs::remove_file(self.blob_path(info.frame)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_dir_creation() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("nested/checkpoints");
        let _store = FileCheckpointStore::open(&subdir).unwrap();
        assert!(subdir.exists());
    }

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();

        let info = store.save(80_000, b"weights").unwrap();
        assert_eq!(info.frame, 80_000);

        let ckpt = store.load(&info).unwrap();
        assert_eq!(ckpt.frame(), 80_000);
        assert_eq!(ckpt.blob, b"weights");
        assert_eq!(ckpt.meta.format_version, CHECKPOINT_FORMAT_VERSION);
    }

    #[test]
    fn test_list_sorted_by_frame() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();
        store.save(300, b"c").unwrap();
        store.save(5, b"a").unwrap();
        store.save(40, b"b").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let frames: Vec<u64> = store.list().unwrap().iter().map(|c| c.frame).collect();
        assert_eq!(frames, vec![5, 40, 300]);
        assert_eq!(store.latest().unwrap().unwrap().frame, 300);
    }

    #[test]
    fn test_empty_store_has_no_latest() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path()).unwrap();
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();
        let info = store.save(10, b"x").unwrap();
        store.remove(&info).unwrap();

        assert!(store.list().unwrap().is_empty());
        assert!(!dir.path().join("checkpoint_000000000010.bin").exists());
    }

    #[test]
    fn test_corrupt_metadata_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();
        let info = store.save(10, b"x").unwrap();
        fs::write(&info.path, "{ not json").unwrap();

        assert!(matches!(store.load(&info), Err(CheckpointError::Metadata { .. })));
    }

    #[test]
    fn test_truncated_blob_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();
        let info = store.save(10, b"weights").unwrap();
        fs::write(dir.path().join("checkpoint_000000000010.bin"), b"wei").unwrap();

        assert!(matches!(store.load(&info), Err(CheckpointError::Metadata { .. })));
    }

    #[test]
    fn test_unknown_format_version_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = FileCheckpointStore::open(dir.path()).unwrap();
        let info = store.save(10, b"x").unwrap();
        let mut meta: CheckpointMeta =
            serde_json::from_str(&fs::read_to_string(&info.path).unwrap()).unwrap();
        meta.format_version = 99;
        fs::write(&info.path, serde_json::to_string(&meta).unwrap()).unwrap();

        assert!(matches!(
            store.load(&info),
            Err(CheckpointError::FormatVersion { found: 99, .. })
        ));
    }
}
