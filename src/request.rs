//! Command execution request.

use crate::authz::Identity;

/// What a caller asked to run.
///
/// Nothing here is trusted: the matcher validates `args` against the policy
/// and asks the authorization provider about `identity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Command name to look up in the registry.
    pub command: String,

    /// Arguments, not including the command itself.
    pub args: Vec<String>,

    /// The authenticated caller.
    pub identity: Identity,
}

impl ExecutionRequest {
    /// Create a request with an anonymous identity.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            identity: Identity::default(),
        }
    }

    /// Set the caller identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}
