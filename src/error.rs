//! Error types for remote_exec.
//!
//! Errors are split by the stage that produces them:
//! - [`ConfigError`]: policy loading failed; fatal at startup, no partial registry
//! - [`Violation`]: an argument list does not fit one variant's rules
//! - [`ResolveError`]: no variant was both argument-valid and authorized
//! - [`ExecError`]: the approved command could not be started or reaped
//! - [`SinkError`]: the caller-facing stream rejected a chunk

use std::path::PathBuf;
use thiserror::Error;

/// Policy loading failure.
///
/// Any of these aborts the whole load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the policy directory or one of its files
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A policy file is not a valid YAML sequence of variants
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A pattern did not compile
    #[error("invalid pattern for {command} ({location}): {pattern}: {source}")]
    InvalidPattern {
        command: String,
        location: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A permitted short flag is not exactly one character
    #[error("short flag for {command} must be a single character: {flag:?}")]
    InvalidShortFlag { command: String, flag: String },

    /// A variant has an empty command name
    #[error("policy variant has an empty command name")]
    EmptyCommand,

    /// Nothing was loaded
    #[error("no command policies defined")]
    NoVariants,
}

/// Argument validation failure for a single variant.
///
/// These never reach the caller directly; the matcher only uses them to skip
/// to the next variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A lone `--`
    #[error("argument is invalid: --")]
    BareDoubleDash,

    /// `---name` or `--=value`
    #[error("bad arg syntax: {arg}")]
    MalformedFlag { arg: String },

    /// `-f=value` style short flag
    #[error("setting values not permitted with short flags: {arg}")]
    ShortFlagValue { arg: String },

    /// Short flag not in the permitted set
    #[error("shorthand flag not permitted: -{flag}")]
    ShortFlagNotPermitted { flag: char },

    /// Long flag not registered
    #[error("long flag not permitted: --{flag}")]
    LongFlagNotPermitted { flag: String },

    /// Long flag registered, value rejected
    #[error("flag value not permitted: --{flag}={value}")]
    FlagValueNotPermitted { flag: String, value: String },

    /// Positional argument not matched by any pattern
    #[error("positional not permitted: {noun}")]
    NounNotPermitted { noun: String },

    /// A required flag never appeared
    #[error("required flag missing: {}", render_flag(.flag))]
    RequiredFlagMissing { flag: String },
}

fn render_flag(flag: &str) -> String {
    if flag.chars().count() == 1 {
        format!("-{flag}")
    } else {
        format!("--{flag}")
    }
}

/// Failure talking to the authorization provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("authorization provider error: {message}")]
pub struct AuthzError {
    pub message: String,
}

impl AuthzError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why an argument-valid variant was not approved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzFailure {
    /// The provider answered no
    #[error("not authorized to {action}: {reason}")]
    Denied { action: String, reason: String },

    /// The provider could not answer
    #[error("could not authorize {action}: {source}")]
    Provider {
        action: String,
        #[source]
        source: AuthzError,
    },
}

/// Failure to pick a variant for a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Zero variants registered under this name
    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    /// At least one variant was argument-valid; the first one's failure
    #[error(transparent)]
    Unauthorized(#[from] AuthzFailure),

    /// No variant accepted the arguments
    #[error("didn't find a command the user could execute")]
    NoMatchingVariant { command: String },
}

/// Execution failure for an approved command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Could not create the output pipe
    #[error("failed to create output pipe: {0}")]
    Pipe(#[source] std::io::Error),

    /// Could not start the process
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Could not reap the process
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// The caller-facing stream is gone or refused a chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("output stream closed: {reason}")]
pub struct SinkError {
    pub reason: String,
}

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Combined error type for the resolve-and-execute flow.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
