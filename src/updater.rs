//! Analysis job descriptors and results
//!
//! An [`UpdateInput`] is the immutable snapshot handed to the engine for one
//! (re)analysis pass. It records the document's `needs_reparse` time point as
//! seen when the job was built; the [`UpdateResult`] carries that value back
//! so the document can tell whether a dirty event arrived while the job was
//! running.
//!
//! # Command line contract
//!
//! The argument list is the configuration's arguments followed by the file
//! path, which is always last:
//!
//! ```text
//! ["-std=c++17", "-Iinclude", "/src/main.cpp"]
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configurations::Configuration;
use crate::engine::{EngineError, ParsingEngine, TranslationUnit};
use crate::error::{Result, TrackerError};
use crate::fs_utils::to_native_separators;
use crate::time_point::TimePoint;
use crate::unsaved_files::{UnsavedFiles, UnsavedFilesSnapshot};

/// Whether a job creates the first unit of a document or replaces one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Parse,
    Reparse,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Reparse => write!(f, "reparse"),
        }
    }
}

/// Immutable input for one analysis pass.
#[derive(Debug, Clone)]
pub struct UpdateInput {
    pub kind: UpdateKind,
    /// Normalized path of the main file
    pub file_path: PathBuf,
    /// Configuration arguments with the file path appended last
    pub command_line_arguments: Vec<String>,
    pub unsaved_files: UnsavedFilesSnapshot,
    /// The document's `needs_reparse` time point when the job was built
    pub needs_reparse_change_time_point: TimePoint,
    /// The configuration's change time point when the job was built
    pub configuration_change_time_point: Option<TimePoint>,
}

impl UpdateInput {
    /// Snapshot everything one analysis of `file_path` needs.
    ///
    /// The overlay is captured for the file and every path of the current
    /// dependency set.
    pub fn build(
        kind: UpdateKind,
        file_path: &Path,
        configuration: &Configuration,
        depended_file_paths: &HashSet<PathBuf>,
        unsaved_files: &UnsavedFiles,
        needs_reparse_change_time_point: TimePoint,
    ) -> Self {
        let file_path = file_path.to_path_buf();
        let snapshot_paths = std::iter::once(&file_path).chain(depended_file_paths.iter());

        Self {
            kind,
            command_line_arguments: command_line_arguments(configuration, &file_path),
            unsaved_files: unsaved_files.snapshot(snapshot_paths),
            file_path,
            needs_reparse_change_time_point,
            configuration_change_time_point: Some(configuration.last_change_time_point()),
        }
    }

    /// Arguments without the trailing file path.
    pub fn configuration_arguments(&self) -> &[String] {
        match self.command_line_arguments.split_last() {
            Some((_, arguments)) => arguments,
            None => &[],
        }
    }
}

/// `configuration.arguments ++ [file_path]`
pub fn command_line_arguments(configuration: &Configuration, file_path: &Path) -> Vec<String> {
    let mut arguments = Vec::with_capacity(configuration.arguments().len() + 1);
    arguments.extend(configuration.arguments().iter().cloned());
    arguments.push(to_native_separators(file_path));
    arguments
}

/// Outcome of one analysis pass, consumed by
/// [`Document::incorporate_updater_result`](crate::document::Document::incorporate_updater_result).
#[derive(Debug)]
pub struct UpdateResult {
    /// The new unit, absent if the pass produced none
    pub translation_unit: Option<TranslationUnit>,
    pub depended_on_file_paths: HashSet<PathBuf>,
    /// When the analysis completed
    pub parse_time_point: TimePoint,
    /// The document's `needs_reparse` time point observed at job start
    pub needs_reparse_change_time_point: TimePoint,
    /// The configuration's change time point observed at job start
    pub configuration_change_time_point: Option<TimePoint>,
    /// The engine reported the main file as missing
    pub file_missing: bool,
}

impl UpdateResult {
    /// An empty result for a job that started at `needs_reparse_change_time_point`.
    pub fn observed_at(needs_reparse_change_time_point: TimePoint) -> Self {
        Self {
            translation_unit: None,
            depended_on_file_paths: HashSet::new(),
            parse_time_point: TimePoint::now(),
            needs_reparse_change_time_point,
            configuration_change_time_point: None,
            file_missing: false,
        }
    }

    pub fn has_parsed(&self) -> bool {
        self.translation_unit.is_some()
    }
}

/// Runs one [`UpdateInput`] through a parsing engine.
pub struct TranslationUnitUpdater {
    engine: Arc<dyn ParsingEngine>,
    input: UpdateInput,
}

impl TranslationUnitUpdater {
    pub fn new(engine: Arc<dyn ParsingEngine>, input: UpdateInput) -> Self {
        Self { engine, input }
    }

    pub fn input(&self) -> &UpdateInput {
        &self.input
    }

    pub fn command_line_arguments(&self) -> &[String] {
        &self.input.command_line_arguments
    }

    /// Run the engine. Must not be called while holding a document lock.
    ///
    /// A missing main file is not an error here: it produces a result with
    /// `file_missing` set so the document can retire itself.
    pub fn execute(self) -> Result<UpdateResult> {
        let start = TimePoint::now();
        let input = self.input;
        tracing::debug!("[UPDATER] Starting {} of {:?}", input.kind, input.file_path);

        match self.engine.analyze(&input) {
            Ok(output) => {
                let parse_time_point = TimePoint::now();
                tracing::info!(
                    "[UPDATER] Finished {} of {:?} in {}ms ({} dependencies)",
                    input.kind,
                    input.file_path,
                    parse_time_point.duration_since(start).as_millis(),
                    output.depended_on_file_paths.len()
                );
                Ok(UpdateResult {
                    translation_unit: Some(output.translation_unit),
                    depended_on_file_paths: output.depended_on_file_paths,
                    parse_time_point,
                    needs_reparse_change_time_point: input.needs_reparse_change_time_point,
                    configuration_change_time_point: input.configuration_change_time_point,
                    file_missing: false,
                })
            }
            Err(EngineError::FileMissing { path }) => {
                tracing::info!("[UPDATER] File {:?} is gone", path);
                Ok(UpdateResult {
                    configuration_change_time_point: input.configuration_change_time_point,
                    file_missing: true,
                    ..UpdateResult::observed_at(input.needs_reparse_change_time_point)
                })
            }
            Err(EngineError::Failed { message }) => {
                tracing::warn!(
                    "[UPDATER] {} of {:?} failed: {}",
                    input.kind,
                    input.file_path,
                    message
                );
                Err(TrackerError::AnalysisFailed {
                    path: input.file_path,
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for TranslationUnitUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationUnitUpdater")
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}
