//! Error types and exit codes for tu-tracker

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for document tracking operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The file backing a document is absent and existence checking is enabled.
    #[error("File does not exist: {}", path.display())]
    FileDoesNotExist { path: PathBuf },

    /// A query that needs document state was made on a null document.
    #[error("Document is null")]
    DocumentIsNull,

    #[error("Document does not exist: {} ({configuration_id})", path.display())]
    DocumentDoesNotExist {
        path: PathBuf,
        configuration_id: String,
    },

    #[error("No document for file: {}", path.display())]
    NoDocumentForFile { path: PathBuf },

    #[error("Configuration does not exist: {}", ids.join(", "))]
    ConfigurationDoesNotExist { ids: Vec<String> },

    #[error("Analysis already in flight for {}", path.display())]
    AnalysisInFlight { path: PathBuf },

    #[error("Analysis failed for {}: {message}", path.display())]
    AnalysisFailed { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Convert error to the exit code used by the binary:
    /// - 0: Success
    /// - 1: File not found / IO error
    /// - 2: Unknown document or configuration
    /// - 3: Analysis failure
    /// - 4: Invalid project or settings file
    /// - 5: Usage error (null document, concurrent analysis)
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileDoesNotExist { .. } => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
            Self::DocumentDoesNotExist { .. } => ExitCode::from(2),
            Self::NoDocumentForFile { .. } => ExitCode::from(2),
            Self::ConfigurationDoesNotExist { .. } => ExitCode::from(2),
            Self::AnalysisFailed { .. } => ExitCode::from(3),
            Self::ConfigError { .. } => ExitCode::from(4),
            Self::DocumentIsNull => ExitCode::from(5),
            Self::AnalysisInFlight { .. } => ExitCode::from(5),
        }
    }

    pub(crate) fn configuration_does_not_exist(id: impl Into<String>) -> Self {
        Self::ConfigurationDoesNotExist {
            ids: vec![id.into()],
        }
    }
}

/// Result type alias for tu-tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;
