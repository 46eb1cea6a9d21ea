//! The event-driven control loop: receives change notifications and drives
//! the child process through stop-then-start restarts.
//!
//! The loop is the only writer of supervisor state. Restarts are sequenced
//! inline on the control path, so the next notification is not consumed until
//! the current stop/start sequence completes and no two restarts can overlap.

use thiserror::Error;

use crate::command::CommandSpec;
use crate::process::{ProcessError, ProcessHandle};
use crate::watcher::{ChangeEvent, ChangeKind, PathFilter, WatchError, WatchObserver, registrar};

/// Loop-fatal errors. Everything else is logged and the loop keeps watching.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("watch channel closed unexpectedly")]
    ChannelClosed,

    #[error("failed to start command: {0}")]
    Spawn(#[from] ProcessError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Supervises one command against one observer.
///
/// Owns the single process slot: at no point do two non-terminated child
/// processes exist, because a replacement is spawned only after
/// [`ProcessHandle::stop`] has fully torn down its predecessor.
pub struct Supervisor {
    spec: CommandSpec,
    observer: WatchObserver,
    filter: PathFilter,
    max_depth: u32,
    handle: Option<ProcessHandle>,
}

impl Supervisor {
    /// The observer should already have its watch set registered via
    /// [`registrar::register_tree`]; `filter` and `max_depth` are reused when
    /// directories created after startup join the watch set.
    pub fn new(
        spec: CommandSpec,
        observer: WatchObserver,
        filter: PathFilter,
        max_depth: u32,
    ) -> Self {
        Self {
            spec,
            observer,
            filter,
            max_depth,
            handle: None,
        }
    }

    /// Spawn the command and run until a loop-fatal error.
    ///
    /// The current child is stopped on every exit path, so a failed run never
    /// leaks a process into the next supervisor instance.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        crate::log_event!("supervisor", "running", "{}", self.spec);
        self.handle = Some(ProcessHandle::spawn(&self.spec)?);

        let result = self.event_loop().await;
        self.stop_current().await;
        result
    }

    async fn event_loop(&mut self) -> Result<(), SupervisorError> {
        loop {
            tokio::select! {
                event = self.observer.events.recv() => {
                    let event = event.ok_or(SupervisorError::ChannelClosed)?;
                    self.handle_change(event).await?;
                }
                error = self.observer.errors.recv() => {
                    let error = error.ok_or(SupervisorError::ChannelClosed)?;
                    tracing::warn!("[watcher] {error}");
                }
            }
        }
    }

    /// React to one change notification.
    ///
    /// Qualifying events (write or create) restart the child; a created
    /// directory additionally joins the watch set first. Everything else is a
    /// no-op. One restart per event: bursts are not coalesced.
    pub async fn handle_change(&mut self, event: ChangeEvent) -> Result<(), SupervisorError> {
        if !event.kind.qualifies() {
            return Ok(());
        }

        if self.filter.is_excluded(&event.path) {
            crate::debug_event!("supervisor", "ignored", "{}", event.path.display());
            return Ok(());
        }

        if event.kind == ChangeKind::Create && event.path.is_dir() {
            self.watch_new_directory(&event.path);
        }

        crate::log_event!("supervisor", "change detected", "{}", event.path.display());
        self.restart().await
    }

    /// A directory created under the watched tree is registered so changes
    /// inside it keep triggering restarts without a full supervisor restart.
    fn watch_new_directory(&mut self, path: &std::path::Path) {
        match registrar::register_tree(
            self.observer.watcher_mut(),
            path,
            self.max_depth,
            &self.filter,
        ) {
            Ok(dirs) => {
                crate::debug_event!("watcher", "added", "{} new directories", dirs.len())
            }
            Err(e) => {
                // Non-fatal: the rest of the watch set is still live
                tracing::warn!(
                    "[watcher] failed to watch new directory {}: {e}",
                    path.display()
                );
            }
        }
    }

    /// Stop the current child, then start a fresh one.
    ///
    /// A stop failure is logged and the start proceeds anyway; a start failure
    /// is loop-fatal and surfaces to the retry driver. Either way the old
    /// process is gone before a new one can exist.
    async fn restart(&mut self) -> Result<(), SupervisorError> {
        self.stop_current().await;
        self.handle = Some(ProcessHandle::spawn(&self.spec)?);
        Ok(())
    }

    /// No-op when the slot is empty.
    async fn stop_current(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.stop().await {
                tracing::warn!("[supervisor] stop failed: {e}");
            }
        }
    }

    /// PID of the supervised child, when one is running.
    pub fn child_id(&self) -> Option<u32> {
        self.handle.as_ref().and_then(|h| h.id())
    }
}
