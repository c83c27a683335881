//! In-memory editor buffers that shadow on-disk content during analysis.
//!
//! `UnsavedFiles` is a cloneable handle; every clone sees the same store.
//! Documents keep a clone so that a job descriptor can snapshot the overlay
//! at build time without going back through the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::fs_utils::normalize_path;
use crate::time_point::TimePoint;

/// Editor content for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsavedFile {
    pub file_path: PathBuf,
    pub content: Arc<[u8]>,
    pub revision: u32,
}

impl UnsavedFile {
    pub fn new(file_path: impl AsRef<Path>, content: impl Into<Vec<u8>>, revision: u32) -> Self {
        Self {
            file_path: normalize_path(file_path.as_ref()),
            content: Arc::from(content.into()),
            revision,
        }
    }
}

#[derive(Debug)]
struct UnsavedFilesData {
    files: HashMap<PathBuf, UnsavedFile>,
    last_change_time_point: TimePoint,
}

/// Path to content store consulted instead of the disk.
#[derive(Debug, Clone)]
pub struct UnsavedFiles {
    data: Arc<RwLock<UnsavedFilesData>>,
}

impl UnsavedFiles {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(UnsavedFilesData {
                files: HashMap::new(),
                last_change_time_point: TimePoint::now(),
            })),
        }
    }

    /// Look up the buffer for `path`.
    pub fn get(&self, path: &Path) -> Option<UnsavedFile> {
        self.data.read().files.get(&normalize_path(path)).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.data.read().files.contains_key(&normalize_path(path))
    }

    /// Store `content` for `path`.
    ///
    /// Returns true if the stored content changed. A revision-only update is
    /// recorded but does not count as a change.
    pub fn set(&self, path: &Path, content: impl Into<Vec<u8>>, revision: u32) -> bool {
        let file = UnsavedFile::new(path, content, revision);
        let mut data = self.data.write();
        let changed = data
            .files
            .get(&file.file_path)
            .map_or(true, |existing| existing.content != file.content);
        data.files.insert(file.file_path.clone(), file);
        if changed {
            data.last_change_time_point = TimePoint::now();
        }
        changed
    }

    /// Drop the buffer for `path`. Returns true if one was stored.
    pub fn remove(&self, path: &Path) -> bool {
        let mut data = self.data.write();
        let removed = data.files.remove(&normalize_path(path)).is_some();
        if removed {
            data.last_change_time_point = TimePoint::now();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.data.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().files.is_empty()
    }

    /// Time of the last content change, insertion or removal.
    pub fn last_change_time_point(&self) -> TimePoint {
        self.data.read().last_change_time_point
    }

    /// Capture the buffers for `paths` that currently have one.
    pub fn snapshot<'a, I>(&self, paths: I) -> UnsavedFilesSnapshot
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        let data = self.data.read();
        let files = paths
            .into_iter()
            .filter_map(|path| data.files.get(path))
            .map(|file| (file.file_path.clone(), Arc::clone(&file.content)))
            .collect();
        UnsavedFilesSnapshot { files }
    }
}

impl Default for UnsavedFiles {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable overlay contents captured for one analysis job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsavedFilesSnapshot {
    files: HashMap<PathBuf, Arc<[u8]>>,
}

impl UnsavedFilesSnapshot {
    /// Content captured for an already normalized path.
    pub fn content(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(|content| content.as_ref())
    }

    /// Shared handle to the content captured for `path`.
    pub fn shared_content(&self, path: &Path) -> Option<Arc<[u8]>> {
        self.files.get(path).map(Arc::clone)
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
