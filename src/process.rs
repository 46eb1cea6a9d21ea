//! Child process lifecycle: spawn, output relay, forcible stop.
//!
//! A [`ProcessHandle`] owns one live child indirectly: the `tokio::process`
//! child is moved into a waiter task that reaps a natural exit or kills the
//! process on demand, and two relay tasks copy the child's stdout and stderr
//! to the console line by line as they arrive. [`ProcessHandle::stop`] joins
//! all three tasks, so a replaced process is fully drained before its
//! successor is spawned.

use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::command::CommandSpec;

/// Errors from process operations.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Child process has no captured {stream} stream")]
    Stdio { stream: &'static str },

    #[error("Failed to kill child process: {0}")]
    Kill(std::io::Error),
}

/// The single currently-managed child process.
///
/// Exclusively owned by the supervisor; at most one non-stopped handle exists
/// at any instant. The handle is consumed by [`stop`](Self::stop), so the type
/// system rules out stopping the same process twice.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    stop_tx: oneshot::Sender<()>,
    waiter: JoinHandle<Result<(), ProcessError>>,
    stdout_relay: JoinHandle<()>,
    stderr_relay: JoinHandle<()>,
}

impl ProcessHandle {
    /// Spawn the command with the supervisor's working directory and attach
    /// the relay and waiter tasks. Returns once the process is created, not
    /// once it has exited.
    pub fn spawn(spec: &CommandSpec) -> Result<Self, ProcessError> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Last line of defense: a dropped handle must not orphan the child
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(ProcessError::Stdio { stream: "stdout" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(ProcessError::Stdio { stream: "stderr" })?;
        let pid = child.id();

        let stdout_relay = tokio::spawn(relay_lines(stdout, tokio::io::stdout()));
        let stderr_relay = tokio::spawn(relay_lines(stderr, tokio::io::stderr()));

        let (stop_tx, stop_rx) = oneshot::channel();
        let waiter = tokio::spawn(wait_or_kill(child, stop_rx));

        crate::debug_event!("process", "started", "{spec} (pid {pid:?})");

        Ok(Self {
            pid,
            stop_tx,
            waiter,
            stdout_relay,
            stderr_relay,
        })
    }

    /// OS process id, if the child has not already been reaped.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Kill the child and join the waiter and both relay tasks.
    ///
    /// Succeeds when the child already exited on its own; the only error is a
    /// kill that genuinely failed. Returns only after both output streams have
    /// reached end-of-stream, so no output from this process can trail into
    /// the console after `stop` returns.
    pub async fn stop(self) -> Result<(), ProcessError> {
        let Self {
            stop_tx,
            waiter,
            stdout_relay,
            stderr_relay,
            ..
        } = self;

        // Send fails when the waiter already reaped a natural exit; that
        // still counts as stopped.
        let _ = stop_tx.send(());

        let result = match waiter.await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!("[process] waiter task failed: {e}");
                Ok(())
            }
        };

        let _ = stdout_relay.await;
        let _ = stderr_relay.await;

        result
    }
}

/// Waits for the child to exit, or kills it when the stop signal arrives.
/// Owns the `Child` so the supervisor never blocks on a long-running process.
async fn wait_or_kill(
    mut child: Child,
    stop_rx: oneshot::Receiver<()>,
) -> Result<(), ProcessError> {
    tokio::select! {
        status = child.wait() => {
            match status {
                Ok(status) => crate::log_event!("process", "exited", "{status}"),
                Err(e) => tracing::warn!("[process] wait failed: {e}"),
            }
            Ok(())
        }
        // Resolves on explicit stop and when the handle is dropped
        _ = stop_rx => {
            child.kill().await.map_err(ProcessError::Kill)
        }
    }
}

/// Forward each line from `reader` to `writer` as it arrives.
///
/// Lines are written whole and flushed immediately, so child output shows up
/// live rather than when the process exits. Per-stream order is preserved;
/// interleaving between stdout and stderr is not.
async fn relay_lines<R, W>(reader: R, mut writer: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
                let _ = writer.flush().await;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("[process] relay read error: {e}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_relay_preserves_line_order() {
        let input: &[u8] = b"A\nB\nC\n";
        let mut out = Cursor::new(Vec::new());
        relay_lines(input, &mut out).await;
        assert_eq!(out.into_inner(), b"A\nB\nC\n");
    }

    #[tokio::test]
    async fn test_relay_handles_missing_trailing_newline() {
        let input: &[u8] = b"only line";
        let mut out = Cursor::new(Vec::new());
        relay_lines(input, &mut out).await;
        assert_eq!(out.into_inner(), b"only line\n");
    }

    #[tokio::test]
    async fn test_relay_empty_stream_writes_nothing() {
        let input: &[u8] = b"";
        let mut out = Cursor::new(Vec::new());
        relay_lines(input, &mut out).await;
        assert!(out.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_and_stop() {
        let handle = ProcessHandle::spawn(&spec("sh", &["-c", "echo hello"])).unwrap();
        assert!(handle.id().is_some());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let err = ProcessHandle::spawn(&spec("definitely-not-a-real-program-xyz", &[]))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_stop_kills_long_running_child() {
        let handle = ProcessHandle::spawn(&spec("sleep", &["30"])).unwrap();
        let started = Instant::now();
        handle.stop().await.unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "stop must kill, not wait for exit"
        );
    }

    #[tokio::test]
    async fn test_stop_after_natural_exit_is_ok() {
        let handle = ProcessHandle::spawn(&spec("true", &[])).unwrap();
        // Give the child time to exit on its own before stopping.
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.stop().await.unwrap();
    }
}
