//! This module provides a local cache for CalDAV data
//!
//! It stores the last listing fetched from the server, so that an app can quickly display the last known tasks on startup.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// A file that holds the last successfully fetched multi-status body
#[derive(Clone, Debug, PartialEq)]
pub struct Cache {
    backing_file: PathBuf,
}

impl Cache {
    pub fn new(path: &Path) -> Self {
        Self {
            backing_file: PathBuf::from(path),
        }
    }

    /// Get the path to the cache file
    pub fn path(&self) -> &Path {
        &self.backing_file
    }

    /// The cached payload, or `None` if nothing has been cached yet
    pub fn load(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.backing_file) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the cached payload
    pub fn save(&self, payload: &[u8]) -> Result<()> {
        if let Some(parent) = self.backing_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.backing_file, payload)?;
        log::debug!("Saved {} bytes to {:?}", payload.len(), self.backing_file);
        Ok(())
    }
}
