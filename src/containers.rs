//! Inbound descriptors supplied by callers.
//!
//! These cross the process boundary (project files, requests), so they are
//! plain serde records. Unsaved content is carried as text on the wire.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Request to create or update the document for one (file, configuration) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContainer {
    /// Path of the translation unit's main file
    #[serde(rename = "path")]
    pub file_path: PathBuf,
    /// Id of the configuration the file is compiled with
    #[serde(rename = "configuration")]
    pub configuration_id: String,
    /// Editor buffer content, if the file has unsaved changes
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_content",
        deserialize_with = "deserialize_content"
    )]
    pub unsaved_content: Option<Vec<u8>>,
    /// Caller-supplied content revision
    #[serde(default)]
    pub revision: u32,
}

impl FileContainer {
    pub fn new(file_path: impl Into<PathBuf>, configuration_id: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            configuration_id: configuration_id.into(),
            unsaved_content: None,
            revision: 0,
        }
    }

    pub fn with_unsaved_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.unsaved_content = Some(content.into());
        self
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn has_unsaved_content(&self) -> bool {
        self.unsaved_content.is_some()
    }
}

/// A named list of compiler arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationContainer {
    pub id: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl ConfigurationContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments<I, S>(id: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }
}

fn serialize_content<S>(content: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match content {
        Some(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_content<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = Option::deserialize(deserializer)?;
    Ok(text.map(String::into_bytes))
}
