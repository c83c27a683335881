//! Compiler configuration registry.
//!
//! A configuration is a named argument list plus the time point of its last
//! argument change. Documents refer to configurations by id and re-resolve
//! them at analysis time, so the registry is handed around as a cloneable
//! handle over shared state.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::containers::ConfigurationContainer;
use crate::error::{Result, TrackerError};
use crate::time_point::TimePoint;

/// A named set of compiler arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    id: String,
    arguments: Vec<String>,
    last_change_time_point: TimePoint,
}

impl Configuration {
    pub fn new(id: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            id: id.into(),
            arguments,
            last_change_time_point: TimePoint::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn last_change_time_point(&self) -> TimePoint {
        self.last_change_time_point
    }

    /// Replace the arguments. Returns true (and bumps the time point) only if
    /// they differ from the stored ones.
    pub fn set_arguments(&mut self, arguments: Vec<String>) -> bool {
        if self.arguments == arguments {
            return false;
        }
        self.arguments = arguments;
        self.last_change_time_point = TimePoint::now();
        true
    }

    /// Drop all arguments.
    pub fn clear(&mut self) -> bool {
        self.set_arguments(Vec::new())
    }
}

/// Registry of configurations keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Configurations {
    entries: Arc<RwLock<HashMap<String, Configuration>>>,
}

impl Configurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert new configurations and update existing ones.
    ///
    /// Returns the ids that were inserted or whose arguments changed, in
    /// input order. Unchanged entries keep their time point.
    pub fn create_or_update(&self, containers: &[ConfigurationContainer]) -> Vec<String> {
        let mut entries = self.entries.write();
        let mut changed = Vec::new();

        for container in containers {
            match entries.get_mut(&container.id) {
                Some(existing) => {
                    if existing.set_arguments(container.arguments.clone()) {
                        tracing::debug!("[CONFIG] Arguments of {} changed", container.id);
                        changed.push(container.id.clone());
                    }
                }
                None => {
                    tracing::debug!("[CONFIG] Registered {}", container.id);
                    entries.insert(
                        container.id.clone(),
                        Configuration::new(container.id.clone(), container.arguments.clone()),
                    );
                    changed.push(container.id.clone());
                }
            }
        }

        changed
    }

    /// Current state of configuration `id`, if registered.
    pub fn find(&self, id: &str) -> Option<Configuration> {
        self.entries.read().get(id).cloned()
    }

    /// Like [`find`](Self::find) but fails for unknown ids.
    pub fn configuration(&self, id: &str) -> Result<Configuration> {
        self.find(id)
            .ok_or_else(|| TrackerError::configuration_does_not_exist(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Clear the arguments of configuration `id`.
    pub fn clear(&self, id: &str) -> Result<bool> {
        self.entries
            .write()
            .get_mut(id)
            .map(Configuration::clear)
            .ok_or_else(|| TrackerError::configuration_does_not_exist(id))
    }

    pub fn remove(&self, id: &str) -> Result<Configuration> {
        self.entries
            .write()
            .remove(id)
            .ok_or_else(|| TrackerError::configuration_does_not_exist(id))
    }

    /// Remove every listed configuration that exists; all unknown ids are
    /// reported together.
    pub fn remove_all(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.entries.write();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| entries.remove(id.as_str()).is_none())
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::ConfigurationDoesNotExist { ids: missing })
        }
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
