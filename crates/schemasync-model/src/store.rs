//! Model persistence.
//!
//! Loads and saves a [`SchemaModel`] as JSON on disk. An absent file on load
//! means "no prior model", which lets the import pipeline short-circuit the
//! diff and persist a freshly introspected model as-is.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::schema::SchemaModel;

/// Reads and writes the persisted schema model.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    /// Creates a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted model. Returns `None` when no model has been
    /// saved yet; IO and parse failures are hard errors.
    pub fn load(&self) -> Result<Option<SchemaModel>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No persisted model found");
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path)?;
        let model: SchemaModel = serde_json::from_str(&data)?;
        debug!(
            path = %self.path.display(),
            entities = model.entities.len(),
            "Loaded persisted model"
        );
        Ok(Some(model))
    }

    /// Saves the model, replacing any previous contents.
    pub fn save(&self, model: &SchemaModel) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_string_pretty(model)?;
        fs::write(&self.path, data)?;
        info!(path = %self.path.display(), "Saved schema model");
        Ok(())
    }
}
