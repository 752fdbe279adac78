//! Durable storage of the last-seen post identifier.
//!
//! The file holds a single bare identifier with no delimiter or trailing
//! structure. Absence means no baseline has been recorded yet.

use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};

/// Single-value persistence for the last notified post id.
///
/// Failures never propagate: a read error is treated as "no prior state" and
/// a write error leaves the caller's in-memory value authoritative.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted identifier.
    ///
    /// Returns `None` when the file is absent, empty, or unreadable.
    pub fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(Some(id)) => {
                tracing::info!(last_seen_id = %id, "loaded last seen id");
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "failed to load last seen id; starting without baseline");
                None
            }
        }
    }

    /// Replace the persisted identifier with `id`.
    ///
    /// Returns `false` when the write failed; the failure is logged here.
    pub fn save(&self, id: &str) -> bool {
        match self.try_save(id) {
            Ok(()) => {
                tracing::info!(last_seen_id = id, "saved last seen id");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save last seen id");
                false
            }
        }
    }

    fn try_load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            MonitorError::StateRead {
                path: self.path.clone(),
                source,
            }
        })?;

        let id = content.trim();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id.to_string()))
    }

    fn try_save(&self, id: &str) -> Result<()> {
        let write_err = |source| MonitorError::StateWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        // Write to a temp file then rename for atomicity.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, id).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        Ok(())
    }
}
