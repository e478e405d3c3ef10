//! Request handling: audit, resolve, execute.
//!
//! `CommandService` is what a transport calls for each incoming request. It
//! holds only shared, read-only state, so one instance serves any number of
//! concurrent requests.

use crate::audit::{record_request, AuditSink, TracingAudit};
use crate::authz::Authorizer;
use crate::config::ExecConfig;
use crate::error::ServiceError;
use crate::matcher::Matcher;
use crate::output::SessionReport;
use crate::registry::Registry;
use crate::request::ExecutionRequest;
use crate::session::execute;
use crate::sink::OutputSink;
use std::future::Future;
use std::sync::Arc;

/// Resolves and runs requests.
///
/// Create using `CommandService::builder()`.
#[derive(Debug, Clone)]
pub struct CommandService {
    matcher: Matcher,
    exec: ExecConfig,
    audit: Arc<dyn AuditSink>,
}

impl CommandService {
    /// Create a new service builder.
    pub fn builder(registry: Arc<Registry>, authorizer: Arc<dyn Authorizer>) -> CommandServiceBuilder {
        CommandServiceBuilder::new(registry, authorizer)
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn exec_config(&self) -> &ExecConfig {
        &self.exec
    }

    /// Handle one request end to end.
    ///
    /// The audit facts are recorded before anything else, whatever the
    /// outcome. Output goes to `sink`; `cancelled` should complete when the
    /// caller disconnects.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Resolve` if no variant is both valid and authorized
    /// - `ServiceError::Exec` if the approved command could not be run
    pub async fn handle<F>(
        &self,
        request: &ExecutionRequest,
        sink: &dyn OutputSink,
        cancelled: F,
    ) -> Result<SessionReport, ServiceError>
    where
        F: Future<Output = ()> + Send,
    {
        record_request(self.audit.as_ref(), &request.command, &request.args);

        let variant = match self
            .matcher
            .resolve(&request.command, &request.args, &request.identity)
            .await
        {
            Ok(variant) => variant,
            Err(e) => {
                tracing::info!(
                    command = %request.command,
                    user = %request.identity.username,
                    error = %e,
                    "request refused"
                );
                return Err(e.into());
            }
        };

        let target = variant.namespaces().unwrap_or(self.exec.default_target);
        let report = execute(
            &self.exec,
            variant.command(),
            &request.args,
            target,
            sink,
            cancelled,
        )
        .await?;

        Ok(report)
    }
}

/// Builder for `CommandService`.
#[derive(Debug, Clone)]
pub struct CommandServiceBuilder {
    matcher: Matcher,
    exec: ExecConfig,
    audit: Arc<dyn AuditSink>,
}

impl CommandServiceBuilder {
    /// Start with default execution settings and `tracing` audit output.
    pub fn new(registry: Arc<Registry>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            matcher: Matcher::new(registry, authorizer),
            exec: ExecConfig::default(),
            audit: Arc::new(TracingAudit),
        }
    }

    /// Set execution settings.
    pub fn exec_config(mut self, exec: ExecConfig) -> Self {
        self.exec = exec;
        self
    }

    /// Set the audit destination.
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn build(self) -> CommandService {
        CommandService {
            matcher: self.matcher,
            exec: self.exec,
            audit: self.audit,
        }
    }
}
