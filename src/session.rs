//! Namespace execution engine.
//!
//! Runs an approved command, attached to a [`NamespaceTarget`] through
//! `nsenter`, and relays its merged stdout/stderr to an [`OutputSink`].
//!
//! Three activities race for the end of a session:
//!
//! 1. process wait: reaps the child, then drops the parent's copy of the
//!    pipe's write end so the relay sees end-of-stream
//! 2. cancellation watch: the caller's `cancelled` future
//! 3. relay: pipe -> sink until end-of-stream, a read error, or a sink error
//!
//! The first of (2) and (3) to finish ends the session. If the child is still
//! running at that point it is killed, then reaped. Everything runs inside
//! the `execute` future, so dropping that future also tears the session down
//! (the child is spawned with `kill_on_drop`).
//!
//! End-of-stream needs every write end closed, not just the child's. A
//! background process the command leaves behind keeps the pipe open, and
//! with it the session, until the caller cancels. Such a process is not the
//! engine's child and is not killed.
//!
//! Through `nsenter` the command is a grandchild; `nsenter --kill-child`
//! makes the kill reach it.

use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::namespace::NamespaceTarget;
use crate::output::{Completion, SessionReport};
use crate::sink::OutputSink;
use std::future::Future;
use std::io::{self, PipeWriter};
use std::os::fd::OwnedFd;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

/// Execute `program args...` in `target` and stream its output to `sink`.
///
/// Returns once the session is over and the child has been reaped. Output
/// produced before the end of the session has already been handed to the
/// sink.
///
/// # Errors
///
/// - `ExecError::Pipe` if the output pipe couldn't be created
/// - `ExecError::Spawn` if the process couldn't be started
/// - `ExecError::Wait` if the process couldn't be reaped
pub async fn execute<F>(
    config: &ExecConfig,
    program: &str,
    args: &[String],
    target: NamespaceTarget,
    sink: &dyn OutputSink,
    cancelled: F,
) -> Result<SessionReport, ExecError>
where
    F: Future<Output = ()> + Send,
{
    let (reader, writer) = io::pipe().map_err(ExecError::Pipe)?;
    let reader = pipe::Receiver::from_owned_fd(OwnedFd::from(reader)).map_err(ExecError::Pipe)?;
    let stdout = writer.try_clone().map_err(ExecError::Pipe)?;
    let stderr = writer.try_clone().map_err(ExecError::Pipe)?;

    let (mut command, launcher) = build_command(config, program, args, target);
    command
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| ExecError::Spawn {
        program: launcher.clone(),
        source,
    })?;
    // The command still holds the child's copies of the write end.
    drop(command);

    tracing::info!(
        program,
        ?args,
        ?target,
        pid = child.id(),
        "session started"
    );

    let relayed = AtomicU64::new(0);
    let (kill_tx, kill_rx) = oneshot::channel();
    let wait = wait_for_exit(child, writer, kill_rx);
    tokio::pin!(wait);

    let mut exit = None;
    let completion = {
        let relay = relay(reader, sink, config.chunk_size.max(1), &relayed);
        tokio::pin!(relay);
        tokio::pin!(cancelled);

        loop {
            tokio::select! {
                biased;
                result = &mut wait, if exit.is_none() => exit = Some(result),
                completion = &mut relay => break completion,
                () = &mut cancelled => break Completion::Cancelled,
            }
        }
        // Relay dropped here, closing the read end.
    };

    let result = match exit {
        Some(result) => result,
        None => {
            // Receiver gone means the wait already finished; it reports so.
            let _ = kill_tx.send(());
            wait.await
        }
    };
    let (status, killed) = result.map_err(|source| ExecError::Wait {
        program: launcher,
        source,
    })?;

    let report = SessionReport {
        completion,
        status,
        killed,
        bytes_relayed: relayed.load(Ordering::Relaxed),
    };

    tracing::info!(
        program,
        completion = ?report.completion,
        status = %report.status,
        killed = report.killed,
        bytes = report.bytes_relayed,
        "session finished"
    );

    Ok(report)
}

/// Build the process to spawn and a name for it in errors.
///
/// The daemon's own namespaces need no `nsenter`.
fn build_command(
    config: &ExecConfig,
    program: &str,
    args: &[String],
    target: NamespaceTarget,
) -> (Command, String) {
    if target.is_self() {
        let mut command = Command::new(program);
        command.args(args);
        (command, program.to_string())
    } else {
        let mut command = Command::new(&config.nsenter);
        command.args(target.nsenter_args()).arg(program).args(args);
        (command, config.nsenter.display().to_string())
    }
}

/// Reap the child, killing it first if asked to.
///
/// Returns the exit status and whether a kill was delivered. The parent's
/// write end is dropped once the child is gone.
async fn wait_for_exit(
    mut child: Child,
    writer: PipeWriter,
    kill: oneshot::Receiver<()>,
) -> io::Result<(ExitStatus, bool)> {
    let result = tokio::select! {
        biased;
        status = child.wait() => status.map(|status| (status, false)),
        Ok(()) = kill => match child.try_wait() {
            Ok(Some(status)) => Ok((status, false)),
            Ok(None) => {
                tracing::debug!(pid = child.id(), "killing session process");
                match child.start_kill() {
                    Ok(()) => child.wait().await.map(|status| (status, true)),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        },
    };
    drop(writer);
    result
}

/// Copy the pipe to the sink until something ends the stream.
async fn relay(
    mut reader: pipe::Receiver,
    sink: &dyn OutputSink,
    chunk_size: usize,
    relayed: &AtomicU64,
) -> Completion {
    let mut buf = vec![0u8; chunk_size];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return Completion::Drained,
            Ok(n) => {
                if let Err(e) = sink.send(&buf[..n]).await {
                    tracing::debug!(error = %e, "output sink closed");
                    return Completion::SinkClosed;
                }
                relayed.fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "output pipe read failed");
                return Completion::ReadFailed;
            }
        }
    }
}
