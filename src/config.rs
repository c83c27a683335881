//! Project file loading.
//!
//! A project file is TOML:
//!
//! ```toml
//! [engine]
//! existence_check = true
//! worker_threads = 0
//! include_system_headers = false
//!
//! [logging]
//! level = "info"
//!
//! [[configurations]]
//! id = "cfg1"
//! arguments = ["-std=c++17", "-Iinclude"]
//!
//! [[files]]
//! path = "src/main.cpp"
//! configuration = "cfg1"
//! ```
//!
//! Relative file paths resolve against the directory of the project file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::configurations::Configurations;
use crate::containers::{ConfigurationContainer, FileContainer};
use crate::document::{DocumentContext, FileExistsCheck};
use crate::documents::Documents;
use crate::engine::TreeSitterEngine;
use crate::error::{Result, TrackerError};
use crate::fs_utils::normalize_path;
use crate::unsaved_files::UnsavedFiles;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub configurations: Vec<ConfigurationContainer>,

    #[serde(default)]
    pub files: Vec<FileContainer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Reject documents whose file is missing when they are created
    #[serde(default = "default_existence_check")]
    pub existence_check: bool,

    /// Analysis threads, 0 for one per core
    #[serde(default)]
    pub worker_threads: usize,

    /// Follow includes into `-isystem` directories
    #[serde(default)]
    pub include_system_headers: bool,
}

fn default_existence_check() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            existence_check: default_existence_check(),
            worker_threads: 0,
            include_system_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TrackerConfig {
    /// Load a project file, resolving relative file paths against its
    /// directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TrackerError::FileDoesNotExist {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;

        let base = normalize_path(path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.resolve_paths(&base);

        tracing::debug!(
            "[CONFIG] Loaded {:?}: {} configurations, {} files",
            path,
            config.configurations.len(),
            config.files.len()
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TrackerError::ConfigError {
            message: format!("Failed to parse project file: {}", e),
        })
    }

    fn resolve_paths(&mut self, base: &Path) {
        for file in &mut self.files {
            let resolved: PathBuf = if file.file_path.is_absolute() {
                normalize_path(&file.file_path)
            } else {
                normalize_path(&base.join(&file.file_path))
            };
            file.file_path = resolved;
        }
    }

    /// Look up the listed entry for `path`.
    pub fn file(&self, path: &Path) -> Option<&FileContainer> {
        let path = normalize_path(path);
        self.files.iter().find(|file| file.file_path == path)
    }

    pub fn file_exists_check(&self) -> FileExistsCheck {
        if self.engine.existence_check {
            FileExistsCheck::Check
        } else {
            FileExistsCheck::DoNotCheck
        }
    }

    /// Register the configurations with a tree-sitter engine and return an
    /// empty document registry ready for [`files`](Self::files).
    pub fn documents(&self) -> Documents {
        let configurations = Configurations::new();
        configurations.create_or_update(&self.configurations);
        let engine =
            TreeSitterEngine::new().with_system_headers(self.engine.include_system_headers);
        let context = DocumentContext::new(configurations, UnsavedFiles::new(), Arc::new(engine));
        Documents::with_options(context, self.file_exists_check())
    }
}
