//! Error types for the watch subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from observer setup and watch registration.
///
/// `Init`, `Register` and `ListDir` are startup-fatal: a partial watch set is
/// not rolled back because the run terminates before anything is watched for
/// real work. `Event` is a runtime error surfaced by the observer; it is
/// logged and the loop keeps watching.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    Init { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    Register { path: PathBuf, reason: String },

    #[error("Failed to list directory {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File system event error: {details}")]
    Event { details: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::Init {
            reason: e.to_string(),
        }
    }
}
