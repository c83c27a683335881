//! Command modules for the tu-tracker CLI
//!
//! Each module implements one subcommand:
//! - `analyze` - analyze every file of a project
//! - `deps` - dependency set of one file
//! - `affected` - documents invalidated by a set of changed files
//!
//! Handlers take their `Args` struct from `cli.rs` plus a shared
//! `CommandContext` and return the rendered output.

pub mod affected;
pub mod analyze;
pub mod deps;

pub use affected::run_affected;
pub use analyze::run_analyze;
pub use deps::run_deps;

use std::path::Path;

use serde::Serialize;

use crate::cli::{OutputFormat, ProjectArgs};
use crate::config::TrackerConfig;
use crate::document::Document;
use crate::documents::Documents;
use crate::error::{Result, TrackerError};
use crate::fs_utils::to_native_separators;
use crate::jobs::{JobOutcome, JobStatus, Jobs};

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub verbose: bool,
}

impl CommandContext {
    pub fn from_cli(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }
}

/// A loaded project with every listed document created.
pub struct Project {
    pub config: TrackerConfig,
    pub documents: Documents,
    pub jobs: Jobs,
}

impl Project {
    pub fn open(args: &ProjectArgs) -> Result<Self> {
        let config = TrackerConfig::load_from(&args.project)?;
        let mut documents = config.documents();
        documents.create(&config.files)?;
        let jobs = Jobs::with_worker_threads(config.engine.worker_threads)?;
        Ok(Self {
            config,
            documents,
            jobs,
        })
    }

    /// Analyze every document that was never analyzed or is dirty.
    pub fn analyze_dirty(&mut self) -> Vec<JobOutcome> {
        self.jobs.add_dirty(&self.documents);
        self.jobs.process(&self.documents)
    }
}

/// Serializable state of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub path: String,
    pub configuration: String,
    pub revision: u32,
    pub intact: bool,
    pub needs_reparse: bool,
    pub deleted: bool,
    /// Sorted
    pub dependencies: Vec<String>,
}

impl DocumentReport {
    pub fn from_document(document: &Document) -> Result<Self> {
        let mut dependencies: Vec<String> = document
            .depended_file_paths()?
            .iter()
            .map(|path| to_native_separators(path))
            .collect();
        dependencies.sort();

        Ok(Self {
            path: to_native_separators(&document.file_path()?),
            configuration: document.configuration_id()?,
            revision: document.document_revision()?,
            intact: document.is_intact(),
            needs_reparse: document.is_needing_reparse(),
            deleted: document.is_deleted(),
            dependencies,
        })
    }

    pub fn state(&self) -> &'static str {
        if self.deleted {
            "deleted"
        } else if self.needs_reparse {
            "needs-reparse"
        } else if self.intact {
            "intact"
        } else {
            "unparsed"
        }
    }

    fn render_text(&self, output: &mut String, with_dependencies: bool) {
        output.push_str(&format!(
            "{} ({}) rev {} [{}]\n",
            self.path,
            self.configuration,
            self.revision,
            self.state()
        ));
        if with_dependencies {
            for dependency in &self.dependencies {
                output.push_str(&format!("  - {}\n", dependency));
            }
        }
    }
}

pub(crate) fn reports(documents: &[Document]) -> Result<Vec<DocumentReport>> {
    documents.iter().map(DocumentReport::from_document).collect()
}

pub(crate) fn failures(outcomes: &[JobOutcome]) -> Vec<serde_json::Value> {
    outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            JobStatus::Failed(message) => Some(serde_json::json!({
                "path": to_native_separators(&outcome.key.file_path),
                "configuration": outcome.key.configuration_id,
                "message": message,
            })),
            _ => None,
        })
        .collect()
}

pub(crate) fn to_json(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| TrackerError::ConfigError {
            message: format!("JSON serialization failed: {}", e),
        })
}

pub(crate) fn push_header(output: &mut String, title: &str) {
    output.push_str("═══════════════════════════════════════════════════════\n");
    output.push_str(&format!("  {}\n", title));
    output.push_str("═══════════════════════════════════════════════════════\n\n");
}

pub(crate) fn push_failures(output: &mut String, outcomes: &[JobOutcome]) {
    for outcome in outcomes {
        if let JobStatus::Failed(message) = &outcome.status {
            output.push_str(&format!("failed: {} ({})\n", outcome.key, message));
        }
    }
}

pub(crate) fn display_path(path: &Path) -> String {
    to_native_separators(path)
}
