//! Per-file analysis state
//!
//! A [`Document`] tracks one (file path, configuration id) pair: the current
//! analyzed unit, the files that unit depends on, and whether it needs to be
//! reparsed.
//!
//! # States
//!
//! ```text
//!  Null ──new()──> Unparsed ──parse()──> Valid ──engine: file missing──> Deleted
//!                                         │  ▲
//!                      dirty event        │  │ reparse(), no newer dirty event
//!                                         ▼  │
//!                                     Valid + needs_reparse
//! ```
//!
//! # Dirty tracking
//!
//! Every transition of `needs_reparse` to true records a fresh
//! [`TimePoint`]. An analysis job captures that time point when it is built
//! and hands it back in its [`UpdateResult`]; incorporating the result only
//! clears `needs_reparse` if no newer dirty event happened in between. The
//! produced unit is kept either way.
//!
//! # Locking
//!
//! The document state sits behind a `parking_lot::Mutex`. The lock is held to
//! build a job and to incorporate its result, never while the engine runs, so
//! dirty notifications are never blocked by an analysis in flight.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::configurations::{Configuration, Configurations};
use crate::containers::FileContainer;
use crate::engine::{ParsingEngine, TranslationUnit};
use crate::error::{Result, TrackerError};
use crate::fs_utils::normalize_path;
use crate::time_point::TimePoint;
use crate::unsaved_files::UnsavedFiles;
use crate::updater::{TranslationUnitUpdater, UpdateInput, UpdateKind, UpdateResult};

/// Whether a missing file is rejected up front or left for the engine to
/// discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileExistsCheck {
    #[default]
    Check,
    DoNotCheck,
}

/// Identity of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub file_path: PathBuf,
    pub configuration_id: String,
}

impl DocumentKey {
    pub fn new(file_path: &Path, configuration_id: impl Into<String>) -> Self {
        Self {
            file_path: normalize_path(file_path),
            configuration_id: configuration_id.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_path.display(), self.configuration_id)
    }
}

/// Collaborators a document consults at analysis time.
#[derive(Clone)]
pub struct DocumentContext {
    pub configurations: Configurations,
    pub unsaved_files: UnsavedFiles,
    pub engine: Arc<dyn ParsingEngine>,
}

impl DocumentContext {
    pub fn new(
        configurations: Configurations,
        unsaved_files: UnsavedFiles,
        engine: Arc<dyn ParsingEngine>,
    ) -> Self {
        Self {
            configurations,
            unsaved_files,
            engine,
        }
    }
}

impl fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContext")
            .field("configurations", &self.configurations.len())
            .field("unsaved_files", &self.unsaved_files.len())
            .finish_non_exhaustive()
    }
}

struct DocumentData {
    context: DocumentContext,
    key: DocumentKey,
    file_exists_check: FileExistsCheck,
    document_revision: u32,

    translation_unit: Option<TranslationUnit>,
    depended_file_paths: HashSet<PathBuf>,

    last_configuration_change_time_point: Option<TimePoint>,
    last_analysis_time_point: Option<TimePoint>,
    needs_reparse: bool,
    needs_reparse_change_time_point: TimePoint,

    is_deleted: bool,
    has_analysis_failed: bool,
    is_analysis_in_flight: bool,

    is_used_by_current_editor: bool,
    is_visible_in_editor: bool,
}

impl DocumentData {
    fn set_dirty(&mut self) {
        self.needs_reparse = true;
        self.needs_reparse_change_time_point = TimePoint::now();
    }

    fn file_is_available(&self) -> bool {
        self.key.file_path.exists() || self.context.unsaved_files.contains(&self.key.file_path)
    }

    fn live_configuration(&self) -> Result<Configuration> {
        self.context
            .configurations
            .configuration(&self.key.configuration_id)
    }

    fn create_updater(&self, kind: UpdateKind) -> Result<TranslationUnitUpdater> {
        let configuration = self.live_configuration()?;
        let kind = if self.translation_unit.is_none() {
            UpdateKind::Parse
        } else {
            kind
        };
        let input = UpdateInput::build(
            kind,
            &self.key.file_path,
            &configuration,
            &self.depended_file_paths,
            &self.context.unsaved_files,
            self.needs_reparse_change_time_point,
        );
        Ok(TranslationUnitUpdater::new(
            Arc::clone(&self.context.engine),
            input,
        ))
    }

    fn incorporate(&mut self, result: UpdateResult) {
        let live_change_time_point = self
            .context
            .configurations
            .find(&self.key.configuration_id)
            .map(|configuration| configuration.last_change_time_point());
        self.last_analysis_time_point = Some(result.parse_time_point);

        if result.file_missing {
            tracing::info!(
                "[DOCUMENT] {} no longer exists, dropping {} dependencies",
                self.key,
                self.depended_file_paths.len()
            );
            self.is_deleted = true;
            self.depended_file_paths.clear();
        } else if let Some(translation_unit) = result.translation_unit {
            // Replacing the unit releases the previous one.
            self.translation_unit = Some(translation_unit);
            self.depended_file_paths = result.depended_on_file_paths;
            self.is_deleted = false;
            self.has_analysis_failed = false;
        }
        self.last_configuration_change_time_point = live_change_time_point;

        let configuration_unchanged = result
            .configuration_change_time_point
            .map_or(true, |observed| Some(observed) == live_change_time_point);

        if !configuration_unchanged {
            tracing::debug!(
                "[DOCUMENT] Configuration of {} changed during analysis",
                self.key
            );
            self.set_dirty();
        } else if result.needs_reparse_change_time_point == self.needs_reparse_change_time_point {
            self.needs_reparse = false;
        } else {
            tracing::debug!(
                "[DOCUMENT] Result for {} started at {} but document was dirtied at {}, keeping it dirty",
                self.key,
                result.needs_reparse_change_time_point,
                self.needs_reparse_change_time_point
            );
        }
    }
}

/// Handle to the analysis state of one (file, configuration) pair.
///
/// Clones share state. The default handle is the null document.
#[derive(Clone, Default)]
pub struct Document {
    d: Option<Arc<Mutex<DocumentData>>>,
}

impl Document {
    /// Create a document for `file_path` compiled with `configuration_id`.
    ///
    /// With [`FileExistsCheck::Check`] a file that is neither on disk nor in
    /// the overlay is rejected with [`TrackerError::FileDoesNotExist`].
    pub fn new(
        file_path: impl AsRef<Path>,
        configuration_id: impl Into<String>,
        context: DocumentContext,
        file_exists_check: FileExistsCheck,
    ) -> Result<Self> {
        let key = DocumentKey::new(file_path.as_ref(), configuration_id);

        if file_exists_check == FileExistsCheck::Check
            && !key.file_path.exists()
            && !context.unsaved_files.contains(&key.file_path)
        {
            return Err(TrackerError::FileDoesNotExist {
                path: key.file_path,
            });
        }

        Ok(Self::from_validated(key, context, file_exists_check, 0))
    }

    /// Build a document whose file was already checked by the caller.
    pub(crate) fn from_validated(
        key: DocumentKey,
        context: DocumentContext,
        file_exists_check: FileExistsCheck,
        document_revision: u32,
    ) -> Self {
        let last_configuration_change_time_point = context
            .configurations
            .find(&key.configuration_id)
            .map(|configuration| configuration.last_change_time_point());

        tracing::debug!("[DOCUMENT] Created {}", key);

        Self {
            d: Some(Arc::new(Mutex::new(DocumentData {
                context,
                key,
                file_exists_check,
                document_revision,
                translation_unit: None,
                depended_file_paths: HashSet::new(),
                last_configuration_change_time_point,
                last_analysis_time_point: None,
                needs_reparse: false,
                needs_reparse_change_time_point: TimePoint::now(),
                is_deleted: false,
                has_analysis_failed: false,
                is_analysis_in_flight: false,
                is_used_by_current_editor: false,
                is_visible_in_editor: false,
            }))),
        }
    }

    /// The null document.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.d.is_none()
    }

    /// Detach this handle from its state, making it null.
    pub fn reset(&mut self) {
        self.d = None;
    }

    fn data(&self) -> Result<&Arc<Mutex<DocumentData>>> {
        self.d.as_ref().ok_or(TrackerError::DocumentIsNull)
    }

    // ========================================================================
    // Identity
    // ========================================================================

    pub fn key(&self) -> Result<DocumentKey> {
        Ok(self.data()?.lock().key.clone())
    }

    pub fn file_path(&self) -> Result<PathBuf> {
        Ok(self.data()?.lock().key.file_path.clone())
    }

    pub fn configuration_id(&self) -> Result<String> {
        Ok(self.data()?.lock().key.configuration_id.clone())
    }

    /// The configuration as it is registered right now.
    pub fn configuration(&self) -> Result<Configuration> {
        self.data()?.lock().live_configuration()
    }

    pub fn document_revision(&self) -> Result<u32> {
        Ok(self.data()?.lock().document_revision)
    }

    pub fn set_document_revision(&self, revision: u32) -> Result<()> {
        self.data()?.lock().document_revision = revision;
        Ok(())
    }

    /// Descriptor that would recreate this document.
    pub fn file_container(&self) -> Result<FileContainer> {
        let data = self.data()?.lock();
        Ok(FileContainer::new(
            data.key.file_path.clone(),
            data.key.configuration_id.clone(),
        )
        .with_revision(data.document_revision))
    }

    // ========================================================================
    // Analysis state
    // ========================================================================

    /// Files the last successful analysis read, the main file included.
    pub fn depended_file_paths(&self) -> Result<HashSet<PathBuf>> {
        Ok(self.data()?.lock().depended_file_paths.clone())
    }

    pub fn is_needing_reparse(&self) -> bool {
        self.d.as_ref().map_or(false, |data| data.lock().needs_reparse)
    }

    pub fn needs_reparse_change_time_point(&self) -> Result<TimePoint> {
        Ok(self.data()?.lock().needs_reparse_change_time_point)
    }

    pub fn last_configuration_change_time_point(&self) -> Result<Option<TimePoint>> {
        Ok(self.data()?.lock().last_configuration_change_time_point)
    }

    pub fn last_analysis_time_point(&self) -> Result<Option<TimePoint>> {
        Ok(self.data()?.lock().last_analysis_time_point)
    }

    /// True if the document has a unit, the file existed at the last
    /// analysis, and that analysis did not fail.
    pub fn is_intact(&self) -> bool {
        self.d.as_ref().map_or(false, |data| {
            let data = data.lock();
            data.translation_unit.is_some() && !data.is_deleted && !data.has_analysis_failed
        })
    }

    pub fn is_parsed(&self) -> bool {
        self.d
            .as_ref()
            .map_or(false, |data| data.lock().translation_unit.is_some())
    }

    /// The engine reported the file missing at the last analysis.
    pub fn is_deleted(&self) -> bool {
        self.d.as_ref().map_or(false, |data| data.lock().is_deleted)
    }

    pub fn has_analysis_failed(&self) -> bool {
        self.d
            .as_ref()
            .map_or(false, |data| data.lock().has_analysis_failed)
    }

    pub fn is_analysis_in_flight(&self) -> bool {
        self.d
            .as_ref()
            .map_or(false, |data| data.lock().is_analysis_in_flight)
    }

    /// Run `f` against the current unit.
    ///
    /// The document stays locked while `f` runs; `f` must not call back into
    /// this document.
    pub fn with_translation_unit<R>(&self, f: impl FnOnce(&TranslationUnit) -> R) -> Result<R> {
        let data = self.data()?.lock();
        data.translation_unit
            .as_ref()
            .map(f)
            .ok_or(TrackerError::DocumentIsNull)
    }

    // ========================================================================
    // Editor hints
    // ========================================================================

    pub fn is_used_by_current_editor(&self) -> bool {
        self.d
            .as_ref()
            .map_or(false, |data| data.lock().is_used_by_current_editor)
    }

    pub fn set_is_used_by_current_editor(&self, used: bool) -> Result<()> {
        self.data()?.lock().is_used_by_current_editor = used;
        Ok(())
    }

    pub fn is_visible_in_editor(&self) -> bool {
        self.d
            .as_ref()
            .map_or(false, |data| data.lock().is_visible_in_editor)
    }

    pub fn set_is_visible_in_editor(&self, visible: bool) -> Result<()> {
        self.data()?.lock().is_visible_in_editor = visible;
        Ok(())
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Build the updater the next analysis would run, without starting it.
    pub fn create_updater(&self) -> Result<TranslationUnitUpdater> {
        self.data()?.lock().create_updater(UpdateKind::Reparse)
    }

    /// Analyze the document.
    ///
    /// The first parse of a document created with [`FileExistsCheck::Check`]
    /// fails with [`TrackerError::FileDoesNotExist`] if the file is gone.
    pub fn parse(&self) -> Result<()> {
        self.update(UpdateKind::Parse)
    }

    /// Analyze the document again. A missing file is left for the engine to
    /// report, which marks the document deleted.
    pub fn reparse(&self) -> Result<()> {
        self.update(UpdateKind::Reparse)
    }

    fn update(&self, kind: UpdateKind) -> Result<()> {
        let updater = self.begin_update(kind)?;
        let result = updater.execute();
        self.finish_update(result)
    }

    fn begin_update(&self, kind: UpdateKind) -> Result<TranslationUnitUpdater> {
        let mut data = self.data()?.lock();

        if data.is_analysis_in_flight {
            return Err(TrackerError::AnalysisInFlight {
                path: data.key.file_path.clone(),
            });
        }

        if kind == UpdateKind::Parse
            && data.file_exists_check == FileExistsCheck::Check
            && data.translation_unit.is_none()
            && !data.file_is_available()
        {
            return Err(TrackerError::FileDoesNotExist {
                path: data.key.file_path.clone(),
            });
        }

        let updater = data.create_updater(kind)?;
        data.is_analysis_in_flight = true;
        Ok(updater)
    }

    fn finish_update(&self, result: Result<UpdateResult>) -> Result<()> {
        let mut data = self.data()?.lock();
        data.is_analysis_in_flight = false;

        match result {
            Ok(result) => {
                data.incorporate(result);
                Ok(())
            }
            Err(error) => {
                data.has_analysis_failed = true;
                data.set_dirty();
                Err(error)
            }
        }
    }

    /// Fold the result of an analysis into the document.
    pub fn incorporate_updater_result(&self, result: UpdateResult) -> Result<()> {
        self.data()?.lock().incorporate(result);
        Ok(())
    }

    // ========================================================================
    // Dirty notifications
    // ========================================================================

    /// Mark the document dirty if `changed_path` is one of its dependencies.
    ///
    /// Returns true if the path matched.
    pub fn set_dirty_if_dependency_is_met(&self, changed_path: &Path) -> bool {
        let Some(data) = &self.d else {
            return false;
        };
        let changed_path = normalize_path(changed_path);
        let mut data = data.lock();

        if data.depended_file_paths.contains(&changed_path) {
            tracing::trace!("[DOCUMENT] {} depends on {:?}", data.key, changed_path);
            data.set_dirty();
            true
        } else {
            false
        }
    }

    /// Mark the document dirty if its configuration changed since the last
    /// analysis. Returns true if it did.
    pub fn set_dirty_if_configuration_is_outdated(&self) -> bool {
        let Some(data) = &self.d else {
            return false;
        };
        let mut data = data.lock();
        let Some(configuration) = data
            .context
            .configurations
            .find(&data.key.configuration_id)
        else {
            return false;
        };

        let outdated = data
            .last_configuration_change_time_point
            .map_or(true, |seen| configuration.last_change_time_point() > seen);
        if outdated {
            tracing::trace!("[DOCUMENT] Configuration of {} is outdated", data.key);
            data.set_dirty();
        }
        outdated
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (&self.d, &other.d) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for Document {}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.d {
            None => f.write_str("Document(null)"),
            Some(data) => {
                let data = data.lock();
                f.debug_struct("Document")
                    .field("key", &data.key)
                    .field("revision", &data.document_revision)
                    .field("parsed", &data.translation_unit.is_some())
                    .field("needs_reparse", &data.needs_reparse)
                    .field("deleted", &data.is_deleted)
                    .field("dependencies", &data.depended_file_paths.len())
                    .finish()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
