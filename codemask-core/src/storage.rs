use crate::errors::StoreError;
use crate::serialization::{rules_from_json, rules_to_json};
use crate::types::Rule;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Persistence backend for the rule list
pub trait RuleStorage {
    /// Previously persisted rules, or `None` if nothing was ever saved
    fn load(&self) -> Result<Option<Vec<Rule>>, StoreError>;

    /// Durably replace the persisted list
    fn save(&self, rules: &[Rule]) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

impl<T: RuleStorage + ?Sized> RuleStorage for Arc<T> {
    fn load(&self) -> Result<Option<Vec<Rule>>, StoreError> {
        (**self).load()
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StoreError> {
        (**self).save(rules)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// JSON file on local disk, in the same format `export` produces
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleStorage for FileStorage {
    fn load(&self) -> Result<Option<Vec<Rule>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json_str =
            fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        rules_from_json(&json_str).map(Some)
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let json_str = rules_to_json(rules)?;
        fs::write(&self.path, json_str).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// In-process storage, useful when the host persists state itself
#[derive(Default)]
pub struct MemoryStorage {
    saved: Mutex<Option<Vec<Rule>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            saved: Mutex::new(Some(rules)),
        }
    }

    /// Last saved list
    pub fn saved(&self) -> Option<Vec<Rule>> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RuleStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<Rule>>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StoreError> {
        // A panic elsewhere while holding the lock leaves the list itself intact
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        *saved = Some(rules.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// No-op storage implementation that disables persistence
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl RuleStorage for NoOpStorage {
    fn load(&self) -> Result<Option<Vec<Rule>>, StoreError> {
        Ok(None) // Always start empty
    }

    fn save(&self, _rules: &[Rule]) -> Result<(), StoreError> {
        Ok(()) // No-op
    }

    fn name(&self) -> &str {
        "noop"
    }
}
