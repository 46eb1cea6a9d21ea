//! Filesystem observation for the supervisor.
//!
//! A single `notify::RecommendedWatcher` is bridged onto two tokio channels
//! that the supervisor selects over: change notifications and watch errors.
//!
//! # Architecture
//!
//! ```text
//! WatchObserver
//!   - notify::RecommendedWatcher (one watch per directory, non-recursive)
//!   - events channel: ChangeEvent {path, kind}
//!   - errors channel: WatchError
//!         |
//!   registrar::register_tree walks the working directory to a bounded
//!   depth and registers each directory, skipping excluded names
//! ```

mod error;
pub mod registrar;

pub use error::WatchError;
pub use registrar::{PathFilter, register_tree};

use std::path::PathBuf;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher};
use tokio::sync::mpsc;

/// Classification of a change notification.
///
/// Only `Write` and `Create` qualify for a restart. Deletes, renames and
/// metadata-only changes map to `Other` and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Write,
    Create,
    Other,
}

impl ChangeKind {
    /// True when this change should trigger a restart.
    pub fn qualifies(self) -> bool {
        matches!(self, ChangeKind::Write | ChangeKind::Create)
    }
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Create,
            // Any covers backends that don't report the modification detail
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                ChangeKind::Write
            }
            _ => ChangeKind::Other,
        }
    }
}

/// One change notification from the observer. Ephemeral: consumed by the
/// supervisor as soon as it is received.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Owns the notify watcher and exposes its notifications as two channels.
///
/// The watch set is populated through [`registrar::register_tree`] at startup
/// and grows when the supervisor registers newly created directories. Dropping
/// the observer releases every watch.
pub struct WatchObserver {
    watcher: RecommendedWatcher,
    pub events: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

impl WatchObserver {
    pub fn new() -> Result<Self, WatchError> {
        let (event_tx, events) = mpsc::channel(256);
        let (error_tx, errors) = mpsc::channel(16);

        // The callback runs on notify's own thread, so blocking sends are fine.
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let kind = ChangeKind::from(&event.kind);
                for path in event.paths {
                    let _ = event_tx.blocking_send(ChangeEvent { path, kind });
                }
            }
            Err(e) => {
                let _ = error_tx.blocking_send(WatchError::Event {
                    details: e.to_string(),
                });
            }
        })?;

        Ok(Self {
            watcher,
            events,
            errors,
        })
    }

    /// Access the underlying watcher for registration.
    pub fn watcher_mut(&mut self) -> &mut RecommendedWatcher {
        &mut self.watcher
    }
}
