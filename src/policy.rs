//! Command policy variants.
//!
//! A [`VariantSpec`] is the declarative record an operator writes; a
//! [`PolicyVariant`] is the same record with every pattern compiled. Several
//! variants may share a command name; the registry keeps them in definition
//! order.

use crate::arg_rules::ArgRules;
use crate::authz::AuthorizationRequest;
use crate::error::{ConfigError, Violation};
use crate::namespace::NamespaceTarget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One configured way a command may be invoked, as written in a policy file.
///
/// ```yaml
/// - cmdName: journalctl
///   requiredFlags: [unit]
///   permittedShortFlags: [f]
///   permittedLongFlags:
///     unit: ["^[a-z0-9@._-]+\\.service$"]
///     no-pager: []
///   authorization:
///     namespace: node-logs
///     verb: get
///     resource: journal
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VariantSpec {
    /// Program name passed to the execution engine.
    pub cmd_name: String,

    /// Flags that must appear at least once.
    #[serde(default)]
    pub required_flags: Vec<String>,

    /// Single-character flags that may appear without a value.
    #[serde(default)]
    pub permitted_short_flags: Vec<String>,

    /// Long flag name -> patterns its value must match.
    ///
    /// An empty list means the flag is allowed with no value only.
    #[serde(default)]
    pub permitted_long_flags: BTreeMap<String, Vec<String>>,

    /// Patterns positional arguments must match.
    ///
    /// An empty list means no positionals (other than `""`).
    #[serde(default)]
    pub permitted_nouns: Vec<String>,

    /// Resource tuple handed to the authorization provider.
    #[serde(default)]
    pub authorization: AuthorizationRequest,

    /// Namespace override; the service default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceTarget>,
}

impl VariantSpec {
    /// Start a record for `cmd_name` that permits nothing.
    pub fn new(cmd_name: impl Into<String>) -> Self {
        Self {
            cmd_name: cmd_name.into(),
            ..Self::default()
        }
    }

    /// Set the required flags.
    pub fn required(mut self, flags: &[&str]) -> Self {
        self.required_flags = flags.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the permitted short flags.
    pub fn short_flags(mut self, flags: &[&str]) -> Self {
        self.permitted_short_flags = flags.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Permit a long flag whose value must match one of `patterns`.
    pub fn long_flag(mut self, name: impl Into<String>, patterns: &[&str]) -> Self {
        self.permitted_long_flags.insert(
            name.into(),
            patterns.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Set the positional patterns.
    pub fn nouns(mut self, patterns: &[&str]) -> Self {
        self.permitted_nouns = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the authorization tuple.
    pub fn authorization(mut self, request: AuthorizationRequest) -> Self {
        self.authorization = request;
        self
    }

    /// Run this variant in a specific namespace target.
    pub fn namespaces(mut self, target: NamespaceTarget) -> Self {
        self.namespaces = Some(target);
        self
    }

    /// Compile the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the command name is empty
    /// - a short flag is not a single character
    /// - any pattern fails to compile
    pub fn compile(self) -> Result<PolicyVariant, ConfigError> {
        if self.cmd_name.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        let rules = ArgRules::from_spec(&self)?;
        Ok(PolicyVariant {
            command: self.cmd_name,
            rules,
            authorization: self.authorization,
            namespaces: self.namespaces,
        })
    }
}

/// A compiled, immutable policy variant.
#[derive(Debug, Clone)]
pub struct PolicyVariant {
    command: String,
    rules: ArgRules,
    authorization: AuthorizationRequest,
    namespaces: Option<NamespaceTarget>,
}

impl PolicyVariant {
    /// The command name this variant is registered under.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The compiled argument whitelist.
    pub fn rules(&self) -> &ArgRules {
        &self.rules
    }

    /// The resource tuple to authorize.
    pub fn authorization(&self) -> &AuthorizationRequest {
        &self.authorization
    }

    /// The per-variant namespace override, if any.
    pub fn namespaces(&self) -> Option<NamespaceTarget> {
        self.namespaces
    }

    /// Validate an argument list against this variant.
    pub fn validate(&self, args: &[String]) -> Result<(), Violation> {
        self.rules.validate(args)
    }
}
