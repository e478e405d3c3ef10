//! How an execution session ended.

use std::process::ExitStatus;

/// Which activity ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The output pipe reached end-of-stream: the child exited and all of its
    /// output was relayed.
    Drained,
    /// The sink refused a chunk.
    SinkClosed,
    /// Reading the output pipe failed.
    ReadFailed,
    /// The caller went away.
    Cancelled,
}

/// Summary of a finished session.
///
/// Output itself is never collected here; it went to the sink as it was
/// produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Which activity finished first.
    pub completion: Completion,

    /// Exit status of the reaped child.
    pub status: ExitStatus,

    /// Whether the engine had to kill the child.
    pub killed: bool,

    /// Bytes handed to the sink.
    pub bytes_relayed: u64,
}

impl SessionReport {
    /// Check if the process exited on its own with code 0.
    pub fn success(&self) -> bool {
        !self.killed && self.status.success()
    }

    /// Get the exit code if the process was not terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}
