use std::path::PathBuf;
use thiserror::Error;

use crate::notifications::NotifyError;
use crate::page::PageError;

/// All errors produced by the X monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The last-seen state file exists but could not be read.
    #[error("Failed to read state file {path}: {source}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The last-seen state file could not be written.
    #[error("Failed to write state file {path}: {source}")]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rendering engine could not be launched or driven.
    #[error("Browser session error: {0}")]
    Session(#[from] PageError),

    /// A push notification could not be delivered.
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;
