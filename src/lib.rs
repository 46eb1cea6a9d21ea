pub mod command;
pub mod config;
pub mod logging;
pub mod process;
pub mod retry;
pub mod supervisor;
pub mod watcher;

pub use command::{CommandError, CommandSpec};
pub use config::Settings;
pub use process::{ProcessError, ProcessHandle};
pub use retry::{RetryPolicy, RetryState};
pub use supervisor::{Supervisor, SupervisorError};
pub use watcher::{ChangeEvent, ChangeKind, PathFilter, WatchError, WatchObserver};
