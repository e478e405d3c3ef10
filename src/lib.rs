//! # remote_exec
//!
//! Policy-matched command execution inside target process namespaces.
//!
//! `remote_exec` is the core of a remote command daemon: a caller names a
//! command and its arguments, the request is matched against an allowlist of
//! policy variants, an external provider decides whether the caller may use
//! the matched variant, and the command runs attached to a target process's
//! namespaces with its merged output streamed back as it is produced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_exec::{
//!     AuthorizationRequest, CommandService, ExecutionRequest, Grant, Identity, Registry,
//!     StaticAuthorizer, VariantSpec,
//! };
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Define the allowlist
//! let registry = Registry::from_specs(vec![
//!     VariantSpec::new("systemctl")
//!         .nouns(&["^restart$", "^web-.*$"])
//!         .authorization(AuthorizationRequest::new("prod", "restart", "services")),
//!     VariantSpec::new("ip").nouns(&["^addr$", "^neigh$"]),
//! ])?;
//!
//! let authz = StaticAuthorizer::new().grant(Grant::group("sre").namespace("prod"));
//! let service = CommandService::builder(Arc::new(registry), Arc::new(authz)).build();
//!
//! // Handle a request, streaming output into a channel
//! let (tx, mut rx) = mpsc::channel::<Vec<u8>>(16);
//! let request = ExecutionRequest::new("systemctl", vec!["restart".into(), "web-api".into()])
//!     .with_identity(Identity::new("alice").with_group("sre"));
//!
//! let printer = tokio::spawn(async move {
//!     while let Some(chunk) = rx.recv().await {
//!         print!("{}", String::from_utf8_lossy(&chunk));
//!     }
//! });
//!
//! let report = service.handle(&request, &tx, std::future::pending()).await?;
//! drop(tx);
//! printer.await?;
//! println!("exit: {:?}", report.code());
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Principles
//!
//! - **No shell interpretation**: Commands use argv-style execution, not shell strings
//! - **Allowlist-only**: Every flag, flag value and positional must be permitted by a variant
//! - **Validate before authorize**: Malformed arguments never reach the provider
//! - **Fail closed**: Any error or ambiguity results in denial
//! - **Immutable policy**: The registry is built once and shared read-only
//!
//! ## Platform Support
//!
//! Linux only in practice: namespace attachment goes through `nsenter` and
//! `/proc`. The crate refuses to build on Windows.

#[cfg(windows)]
compile_error!(
    "remote_exec does not support Windows. \
     Namespace attachment relies on nsenter and Unix pipes."
);

mod arg_parser;
mod arg_rules;
mod audit;
mod authz;
mod config;
mod error;
mod matcher;
mod namespace;
mod output;
mod policy;
mod registry;
mod request;
mod service;
mod session;
mod sink;

// Public API
pub use arg_parser::{classify_arg, ArgType};
pub use arg_rules::{ArgRules, PatternSet};
pub use audit::{AuditSink, TracingAudit, COMMAND_ARGS, COMMAND_NAME};
pub use authz::{
    AuthorizationRequest, Authorizer, Decision, Grant, Identity, StaticAuthorizer, Subject,
};
pub use config::{load_policy_dir, parse_policy_str, ExecConfig, DEFAULT_CHUNK_SIZE};
pub use error::{
    AuthzError, AuthzFailure, ConfigError, ExecError, ResolveError, ServiceError, SinkError,
    Violation,
};
pub use matcher::Matcher;
pub use namespace::NamespaceTarget;
pub use output::{Completion, SessionReport};
pub use policy::{PolicyVariant, VariantSpec};
pub use registry::Registry;
pub use request::ExecutionRequest;
pub use service::{CommandService, CommandServiceBuilder};
pub use session::execute;
pub use sink::OutputSink;
