//! Authorization provider boundary.
//!
//! The matcher never decides on its own whether a caller may run a variant:
//! it hands the caller's [`Identity`] and the variant's
//! [`AuthorizationRequest`] to an [`Authorizer`]. The request mirrors a
//! Kubernetes `SubjectAccessReview` resource attribute set, but nothing here
//! depends on Kubernetes.

use crate::error::AuthzError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated caller, as resolved by the transport.
///
/// Opaque to the matcher; forwarded verbatim to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

/// Resource tuple a variant is guarded by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizationRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub verb: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub subresource: String,
    #[serde(default)]
    pub name: String,
}

impl AuthorizationRequest {
    pub fn new(
        namespace: impl Into<String>,
        verb: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            verb: verb.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>, version: impl Into<String>) -> Self {
        self.group = group.into();
        self.version = version.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for AuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.resource)?;
        if !self.subresource.is_empty() {
            write!(f, "/{}", self.subresource)?;
        }
        if !self.name.is_empty() {
            write!(f, " {}", self.name)?;
        }
        if !self.namespace.is_empty() {
            write!(f, " in namespace {}", self.namespace)?;
        }
        Ok(())
    }
}

/// A provider's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(String),
}

/// External authorization provider.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Decide whether `identity` may perform `request`.
    ///
    /// `Err` means the provider could not answer; the matcher treats it like
    /// a denial when moving on to the next variant.
    async fn authorize(
        &self,
        identity: &Identity,
        request: &AuthorizationRequest,
    ) -> Result<Decision, AuthzError>;
}

/// Who a [`Grant`] applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    User(String),
    Group(String),
    Anyone,
}

impl Subject {
    fn covers(&self, identity: &Identity) -> bool {
        match self {
            Subject::User(user) => *user == identity.username,
            Subject::Group(group) => identity.groups.iter().any(|g| g == group),
            Subject::Anyone => true,
        }
    }
}

/// One allow rule. Empty fields match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    subject: Subject,
    namespace: String,
    verb: String,
    resource: String,
}

impl Grant {
    pub fn user(name: impl Into<String>) -> Self {
        Self::for_subject(Subject::User(name.into()))
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::for_subject(Subject::Group(name.into()))
    }

    pub fn anyone() -> Self {
        Self::for_subject(Subject::Anyone)
    }

    fn for_subject(subject: Subject) -> Self {
        Self {
            subject,
            namespace: String::new(),
            verb: String::new(),
            resource: String::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    fn permits(&self, identity: &Identity, request: &AuthorizationRequest) -> bool {
        fn field(rule: &str, value: &str) -> bool {
            rule.is_empty() || rule == value
        }
        self.subject.covers(identity)
            && field(&self.namespace, &request.namespace)
            && field(&self.verb, &request.verb)
            && field(&self.resource, &request.resource)
    }
}

/// In-process authorizer backed by a fixed list of grants.
///
/// Useful for single-node deployments and for tests; anything not granted is
/// denied.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    grants: Vec<Grant>,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an allow rule.
    pub fn grant(mut self, grant: Grant) -> Self {
        self.grants.push(grant);
        self
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(
        &self,
        identity: &Identity,
        request: &AuthorizationRequest,
    ) -> Result<Decision, AuthzError> {
        if self.grants.iter().any(|g| g.permits(identity, request)) {
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::Denied(format!(
                "user {:?} has no grant for {}",
                identity.username, request
            )))
        }
    }
}
