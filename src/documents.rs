//! Registry of documents keyed by (file path, configuration id)
//!
//! `Documents` is the single entry point for creating, finding and removing
//! documents, and it fans file and configuration change notifications out to
//! every document they affect. It also routes overlay and configuration edits
//! so the matching broadcast is never forgotten.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::configurations::Configurations;
use crate::containers::{ConfigurationContainer, FileContainer};
use crate::document::{Document, DocumentContext, DocumentKey, FileExistsCheck};
use crate::error::{Result, TrackerError};
use crate::fs_utils::normalize_path;
use crate::unsaved_files::UnsavedFiles;

#[derive(Debug)]
pub struct Documents {
    context: DocumentContext,
    file_exists_check: FileExistsCheck,
    documents: HashMap<DocumentKey, Document>,
    /// configuration id -> keys of the documents compiled with it
    by_configuration: HashMap<String, HashSet<DocumentKey>>,
}

impl Documents {
    pub fn new(context: DocumentContext) -> Self {
        Self::with_options(context, FileExistsCheck::Check)
    }

    pub fn with_options(context: DocumentContext, file_exists_check: FileExistsCheck) -> Self {
        Self {
            context,
            file_exists_check,
            documents: HashMap::new(),
            by_configuration: HashMap::new(),
        }
    }

    pub fn context(&self) -> &DocumentContext {
        &self.context
    }

    pub fn configurations(&self) -> &Configurations {
        &self.context.configurations
    }

    pub fn unsaved_files(&self) -> &UnsavedFiles {
        &self.context.unsaved_files
    }

    pub fn file_exists_check(&self) -> FileExistsCheck {
        self.file_exists_check
    }

    // ========================================================================
    // Creation and update
    // ========================================================================

    /// Create documents for `containers`, updating the ones that already exist.
    ///
    /// The whole batch is validated first: unknown configuration ids and, with
    /// the existence check enabled, missing files fail the call before any
    /// document is created. Returns the documents in input order.
    pub fn create(&mut self, containers: &[FileContainer]) -> Result<Vec<Document>> {
        self.check_configurations_exist(containers)?;
        if self.file_exists_check == FileExistsCheck::Check {
            self.check_files_exist(containers)?;
        }

        // Build every new document before touching the overlay or the maps.
        let mut batch: Vec<(DocumentKey, Option<Document>)> = Vec::with_capacity(containers.len());
        let mut pending = HashSet::new();
        for container in containers {
            let key = DocumentKey::new(&container.file_path, container.configuration_id.clone());
            let fresh = !self.documents.contains_key(&key) && pending.insert(key.clone());
            let document = fresh.then(|| {
                Document::from_validated(
                    key.clone(),
                    self.context.clone(),
                    self.file_exists_check,
                    container.revision,
                )
            });
            batch.push((key, document));
        }

        let mut changed_paths = Vec::new();
        let mut created = 0usize;
        let mut documents = Vec::with_capacity(containers.len());

        for ((key, fresh), container) in batch.into_iter().zip(containers) {
            if self.apply_unsaved_content(&key.file_path, container) {
                changed_paths.push(key.file_path.clone());
            }

            let document = match fresh {
                Some(document) => {
                    tracing::debug!("[DOCUMENTS] Inserted {}", key);
                    self.insert(key, document.clone());
                    created += 1;
                    document
                }
                None => {
                    let document = self.document_for_key(&key)?;
                    document.set_document_revision(container.revision)?;
                    document
                }
            };
            documents.push(document);
        }

        tracing::info!(
            "[DOCUMENTS] Created {} and updated {} documents",
            created,
            documents.len() - created
        );
        for path in changed_paths {
            self.notify_file_changed(&path);
        }

        Ok(documents)
    }

    /// Update revision and overlay content of existing documents.
    pub fn update(&mut self, containers: &[FileContainer]) -> Result<Vec<Document>> {
        let keys: Vec<DocumentKey> = containers
            .iter()
            .map(|container| {
                DocumentKey::new(&container.file_path, container.configuration_id.clone())
            })
            .collect();
        if let Some(missing) = keys.iter().find(|key| !self.documents.contains_key(*key)) {
            return Err(TrackerError::DocumentDoesNotExist {
                path: missing.file_path.clone(),
                configuration_id: missing.configuration_id.clone(),
            });
        }

        let mut changed_paths = Vec::new();
        let mut documents = Vec::with_capacity(containers.len());
        for (key, container) in keys.iter().zip(containers) {
            if self.apply_unsaved_content(&key.file_path, container) {
                changed_paths.push(key.file_path.clone());
            }
            let document = self.document_for_key(key)?;
            document.set_document_revision(container.revision)?;
            documents.push(document);
        }

        for path in changed_paths {
            self.notify_file_changed(&path);
        }
        Ok(documents)
    }

    fn check_configurations_exist(&self, containers: &[FileContainer]) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();
        for container in containers {
            if !self.context.configurations.contains(&container.configuration_id)
                && !missing.contains(&container.configuration_id)
            {
                missing.push(container.configuration_id.clone());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::ConfigurationDoesNotExist { ids: missing })
        }
    }

    fn check_files_exist(&self, containers: &[FileContainer]) -> Result<()> {
        for container in containers {
            let path = normalize_path(&container.file_path);
            let available = container.has_unsaved_content()
                || path.exists()
                || self.context.unsaved_files.contains(&path);
            if !available {
                return Err(TrackerError::FileDoesNotExist { path });
            }
        }
        Ok(())
    }

    /// Returns true if the overlay content changed.
    fn apply_unsaved_content(&self, path: &Path, container: &FileContainer) -> bool {
        match &container.unsaved_content {
            Some(content) => {
                self.context
                    .unsaved_files
                    .set(path, content.clone(), container.revision)
            }
            None => false,
        }
    }

    fn insert(&mut self, key: DocumentKey, document: Document) {
        self.by_configuration
            .entry(key.configuration_id.clone())
            .or_default()
            .insert(key.clone());
        self.documents.insert(key, document);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn find(&self, file_path: &Path, configuration_id: &str) -> Option<Document> {
        self.documents
            .get(&DocumentKey::new(file_path, configuration_id))
            .cloned()
    }

    pub fn document(&self, file_path: &Path, configuration_id: &str) -> Result<Document> {
        self.document_for_key(&DocumentKey::new(file_path, configuration_id))
    }

    pub fn document_for_key(&self, key: &DocumentKey) -> Result<Document> {
        self.documents
            .get(key)
            .cloned()
            .ok_or_else(|| TrackerError::DocumentDoesNotExist {
                path: key.file_path.clone(),
                configuration_id: key.configuration_id.clone(),
            })
    }

    pub fn contains(&self, file_path: &Path, configuration_id: &str) -> bool {
        self.documents
            .contains_key(&DocumentKey::new(file_path, configuration_id))
    }

    /// Every key, sorted.
    pub fn keys(&self) -> Vec<DocumentKey> {
        let mut keys: Vec<DocumentKey> = self.documents.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every document, sorted by key.
    pub fn documents(&self) -> Vec<Document> {
        self.filtered(|_| true)
    }

    /// Documents matching `predicate`, sorted by key.
    pub fn filtered(&self, predicate: impl Fn(&Document) -> bool) -> Vec<Document> {
        let mut matching: Vec<(&DocumentKey, &Document)> = self
            .documents
            .iter()
            .filter(|(_, document)| predicate(document))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(b.0));
        matching
            .into_iter()
            .map(|(_, document)| document.clone())
            .collect()
    }

    pub fn dirty_documents(&self) -> Vec<Document> {
        self.filtered(Document::is_needing_reparse)
    }

    /// Every document analyzing `file_path` as its main file.
    pub fn documents_for_file(&self, file_path: &Path) -> Vec<Document> {
        let file_path = normalize_path(file_path);
        self.filtered(|document| {
            document
                .file_path()
                .map_or(false, |path| path == file_path)
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove every document whose main file is `file_path`.
    pub fn remove(&mut self, file_path: &Path) -> Result<Vec<Document>> {
        let file_path = normalize_path(file_path);
        let keys: Vec<DocumentKey> = self
            .documents
            .keys()
            .filter(|key| key.file_path == file_path)
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(TrackerError::NoDocumentForFile { path: file_path });
        }

        let removed: Vec<Document> = keys
            .iter()
            .filter_map(|key| self.remove_key(key))
            .collect();
        tracing::info!(
            "[DOCUMENTS] Removed {} documents for {:?}",
            removed.len(),
            file_path
        );
        Ok(removed)
    }

    pub fn remove_document(&mut self, file_path: &Path, configuration_id: &str) -> Result<Document> {
        let key = DocumentKey::new(file_path, configuration_id);
        self.remove_key(&key)
            .ok_or(TrackerError::DocumentDoesNotExist {
                path: key.file_path,
                configuration_id: key.configuration_id,
            })
    }

    fn remove_key(&mut self, key: &DocumentKey) -> Option<Document> {
        let document = self.documents.remove(key)?;
        if let Some(keys) = self.by_configuration.get_mut(&key.configuration_id) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_configuration.remove(&key.configuration_id);
            }
        }
        Some(document)
    }

    // ========================================================================
    // Broadcasts
    // ========================================================================

    /// Mark dirty every document that depends on `file_path`.
    ///
    /// Returns how many documents matched.
    pub fn notify_file_changed(&self, file_path: &Path) -> usize {
        let file_path = normalize_path(file_path);
        let affected = self
            .documents
            .values()
            .filter(|document| document.set_dirty_if_dependency_is_met(&file_path))
            .count();
        tracing::debug!(
            "[DOCUMENTS] Change of {:?} affects {} documents",
            file_path,
            affected
        );
        affected
    }

    /// Mark dirty every document compiled with `configuration_id` whose
    /// configuration changed since its last analysis.
    pub fn notify_configuration_changed(&self, configuration_id: &str) -> usize {
        let Some(keys) = self.by_configuration.get(configuration_id) else {
            return 0;
        };
        let affected = keys
            .iter()
            .filter_map(|key| self.documents.get(key))
            .filter(|document| document.set_dirty_if_configuration_is_outdated())
            .count();
        tracing::debug!(
            "[DOCUMENTS] Change of configuration {} affects {} documents",
            configuration_id,
            affected
        );
        affected
    }

    /// Update the configuration registry and notify the documents of every
    /// configuration that changed. Returns the changed ids.
    pub fn update_configurations(&self, containers: &[ConfigurationContainer]) -> Vec<String> {
        let changed = self.context.configurations.create_or_update(containers);
        for id in &changed {
            self.notify_configuration_changed(id);
        }
        changed
    }

    /// Remove configuration `configuration_id` and every document using it.
    pub fn remove_configuration(&mut self, configuration_id: &str) -> Result<Vec<Document>> {
        self.context.configurations.remove(configuration_id)?;
        let keys = self
            .by_configuration
            .remove(configuration_id)
            .unwrap_or_default();

        let removed: Vec<Document> = keys
            .iter()
            .filter_map(|key| self.documents.remove(key))
            .collect();
        tracing::info!(
            "[DOCUMENTS] Removed configuration {} with {} documents",
            configuration_id,
            removed.len()
        );
        Ok(removed)
    }

    // ========================================================================
    // Overlay routing
    // ========================================================================

    /// Store editor content for `file_path`. Returns how many documents were
    /// marked dirty.
    pub fn set_unsaved_content(
        &self,
        file_path: &Path,
        content: impl Into<Vec<u8>>,
        revision: u32,
    ) -> usize {
        if self
            .context
            .unsaved_files
            .set(file_path, content, revision)
        {
            self.notify_file_changed(file_path)
        } else {
            0
        }
    }

    /// Drop editor content for `file_path`, falling back to the disk.
    pub fn remove_unsaved_content(&self, file_path: &Path) -> usize {
        if self.context.unsaved_files.remove(file_path) {
            self.notify_file_changed(file_path)
        } else {
            0
        }
    }

    // ========================================================================
    // Editor hints
    // ========================================================================

    /// Flag the documents of `file_path` as the current editor's, clearing the
    /// flag everywhere else.
    pub fn set_used_by_current_editor(&self, file_path: &Path) -> Result<()> {
        let file_path = normalize_path(file_path);
        for (key, document) in &self.documents {
            document.set_is_used_by_current_editor(key.file_path == file_path)?;
        }
        Ok(())
    }

    /// Flag the documents of `file_paths` as visible, clearing the flag
    /// everywhere else.
    pub fn set_visible_in_editors(&self, file_paths: &[PathBuf]) -> Result<()> {
        let visible: HashSet<PathBuf> = file_paths.iter().map(|path| normalize_path(path)).collect();
        for (key, document) in &self.documents {
            document.set_is_visible_in_editor(visible.contains(&key.file_path))?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
