//! Streaming output sink.
//!
//! The transport that owns a request implements [`OutputSink`]; the execution
//! engine calls it once per chunk, in the order the child produced the bytes.

use crate::error::SinkError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Receives a session's merged stdout/stderr incrementally.
///
/// An `Err` is terminal for the session: the engine stops relaying and tears
/// the process down.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn send(&self, chunk: &[u8]) -> Result<(), SinkError>;
}

/// Bridge to a transport task through a bounded channel.
///
/// A dropped receiver is a send error; pair with [`mpsc::Sender::closed`] as
/// the session's cancellation future.
#[async_trait]
impl OutputSink for mpsc::Sender<Vec<u8>> {
    async fn send(&self, chunk: &[u8]) -> Result<(), SinkError> {
        mpsc::Sender::send(self, chunk.to_vec())
            .await
            .map_err(|_| SinkError::new("receiver dropped"))
    }
}
