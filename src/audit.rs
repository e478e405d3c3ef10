//! Audit facts.
//!
//! Every request records which command was asked for and with what
//! arguments, whatever the outcome.

use std::fmt::Debug;

/// Audit key for the requested command name.
pub const COMMAND_NAME: &str = "command.name";

/// Audit key for the rendered argument list.
pub const COMMAND_ARGS: &str = "command.args";

/// Destination for per-request key/value audit facts.
pub trait AuditSink: Send + Sync + Debug {
    fn record(&self, key: &str, value: &str);
}

/// Emits audit facts as `tracing` events under the `remote_exec::audit`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, key: &str, value: &str) {
        tracing::info!(target: "remote_exec::audit", key, value, "audit");
    }
}

/// Record both request facts.
pub(crate) fn record_request(sink: &dyn AuditSink, command: &str, args: &[String]) {
    sink.record(COMMAND_NAME, command);
    sink.record(COMMAND_ARGS, &format!("{args:?}"));
}
