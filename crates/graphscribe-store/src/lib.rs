//! GraphScribe Storage Layer
//!
//! Implements the `TemplateStore` trait over a single JSON file.
//!
//! # Architecture
//!
//! - The whole template record set (templates plus language slots) is one
//!   JSON document
//! - Writes go to a sibling temp file that is then renamed over the target,
//!   so readers never see a half-written file
//! - [`MemoryStore`] keeps the set in process for tests
//!
//! # Examples
//!
//! ```no_run
//! use graphscribe_store::JsonFileStore;
//! use graphscribe_domain::traits::TemplateStore;
//!
//! let store = JsonFileStore::new("prompt_templates.json");
//! let set = store.load().unwrap();
//! println!("{} templates", set.len());
//! ```

#![warn(missing_docs)]

mod memory;

pub use memory::MemoryStore;

use graphscribe_domain::traits::TemplateStore;
use graphscribe_domain::{ErrorKind, TemplateSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error on template file: {0}")]
    Io(#[from] io::Error),

    /// The file is not a valid template document
    #[error("Invalid template file: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store cannot be used right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Storage failures are internal from the caller's point of view
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

/// JSON-file implementation of [`TemplateStore`]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`; the file is created on first persist
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "templates.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TemplateStore for JsonFileStore {
    type Error = StoreError;

    fn load(&self) -> Result<TemplateSet, Self::Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Template file {} not found, starting empty", self.path.display());
                return Ok(TemplateSet::new());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(TemplateSet::new());
        }

        let mut set: TemplateSet = serde_json::from_str(&contents)?;
        set.normalize();

        debug!("Loaded {} templates from {}", set.len(), self.path.display());
        Ok(set)
    }

    fn persist(&mut self, set: &TemplateSet) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(set)?;
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!("Persisted {} templates to {}", set.len(), self.path.display());
        Ok(())
    }
}
