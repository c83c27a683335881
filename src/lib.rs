//! tu-tracker: incremental translation unit tracking for C and C++
//!
//! The crate keeps one [`Document`] per (file, configuration) pair and knows
//! at any moment whether its analyzed unit is still valid. File edits, overlay
//! changes and configuration changes are broadcast through [`Documents`] to
//! every document they affect; reanalysis runs through the coalescing
//! [`Jobs`] queue.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use tu_tracker::{
//!     ConfigurationContainer, Configurations, DocumentContext, Documents, FileContainer,
//!     TreeSitterEngine, UnsavedFiles,
//! };
//!
//! let configurations = Configurations::new();
//! configurations.create_or_update(&[ConfigurationContainer::with_arguments(
//!     "cfg1",
//!     ["-std=c++17"],
//! )]);
//! let context = DocumentContext::new(
//!     configurations,
//!     UnsavedFiles::new(),
//!     Arc::new(TreeSitterEngine::new()),
//! );
//! let mut documents = Documents::new(context);
//!
//! let created = documents.create(&[FileContainer::new("src/main.cpp", "cfg1")])?;
//! created[0].parse()?;
//!
//! documents.notify_file_changed(Path::new("src/util.h"));
//! if created[0].is_needing_reparse() {
//!     created[0].reparse()?;
//! }
//! # Ok::<(), tu_tracker::TrackerError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod configurations;
pub mod containers;
pub mod document;
pub mod documents;
pub mod engine;
pub mod error;
pub mod fs_utils;
pub mod jobs;
pub mod lang;
pub mod time_point;
pub mod unsaved_files;
pub mod updater;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use configurations::{Configuration, Configurations};
pub use containers::{ConfigurationContainer, FileContainer};
pub use document::{Document, DocumentContext, DocumentKey, FileExistsCheck};
pub use documents::Documents;
pub use engine::{
    EngineError, EngineOutput, ParsingEngine, SyntaxUnit, TranslationUnit, TreeSitterEngine,
};
pub use error::{Result, TrackerError};
pub use jobs::{JobOutcome, JobStatus, Jobs};
pub use lang::Lang;
pub use time_point::TimePoint;
pub use unsaved_files::{UnsavedFile, UnsavedFiles, UnsavedFilesSnapshot};
pub use updater::{TranslationUnitUpdater, UpdateInput, UpdateKind, UpdateResult};
