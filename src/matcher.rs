//! Policy matching.
//!
//! For a request, try each variant registered under the command name in
//! definition order. A variant is selected only if the arguments validate
//! against it AND the authorization provider approves it. Arguments are
//! always checked before the provider is asked, so malformed arguments never
//! reveal which variants a caller is authorized for.

use crate::authz::{Authorizer, Decision, Identity};
use crate::error::{AuthzFailure, ResolveError};
use crate::policy::PolicyVariant;
use crate::registry::Registry;
use std::sync::Arc;

/// Resolves requests against an immutable registry.
#[derive(Clone)]
pub struct Matcher {
    registry: Arc<Registry>,
    authorizer: Arc<dyn Authorizer>,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Matcher {
    pub fn new(registry: Arc<Registry>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            registry,
            authorizer,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Find the first variant that accepts `args` and that `identity` is
    /// authorized to run.
    ///
    /// # Errors
    ///
    /// - `CommandNotFound` if nothing is registered under `command`
    /// - `Unauthorized` with the FIRST authorization failure, if any variant
    ///   accepted the arguments
    /// - `NoMatchingVariant` if no variant accepted the arguments
    pub async fn resolve(
        &self,
        command: &str,
        args: &[String],
        identity: &Identity,
    ) -> Result<&PolicyVariant, ResolveError> {
        let variants = self.registry.variants(command);
        if variants.is_empty() {
            return Err(ResolveError::CommandNotFound {
                command: command.to_string(),
            });
        }

        let mut first_failure: Option<AuthzFailure> = None;

        for (index, variant) in variants.iter().enumerate() {
            if let Err(violation) = variant.validate(args) {
                tracing::debug!(command, index, %violation, "variant rejected arguments");
                continue;
            }

            let request = variant.authorization();
            let failure = match self.authorizer.authorize(identity, request).await {
                Ok(Decision::Allowed) => {
                    tracing::debug!(command, index, user = %identity.username, "variant authorized");
                    return Ok(variant);
                }
                Ok(Decision::Denied(reason)) => AuthzFailure::Denied {
                    action: request.to_string(),
                    reason,
                },
                Err(source) => {
                    tracing::warn!(command, index, error = %source, "authorization provider failed");
                    AuthzFailure::Provider {
                        action: request.to_string(),
                        source,
                    }
                }
            };

            tracing::debug!(command, index, user = %identity.username, %failure, "variant not authorized");
            if first_failure.is_none() {
                first_failure = Some(failure);
            }
        }

        match first_failure {
            Some(failure) => Err(ResolveError::Unauthorized(failure)),
            None => Err(ResolveError::NoMatchingVariant {
                command: command.to_string(),
            }),
        }
    }
}
