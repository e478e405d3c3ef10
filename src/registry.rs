//! The command policy registry.
//!
//! Built once from configuration and read-only afterwards; share it with
//! `Arc<Registry>` rather than rebuilding or mutating it.

use crate::config::{load_policy_dir, parse_policy_str};
use crate::error::ConfigError;
use crate::policy::{PolicyVariant, VariantSpec};
use std::collections::HashMap;
use std::path::Path;

/// Command name -> variants in definition order.
#[derive(Debug, Clone)]
pub struct Registry {
    commands: HashMap<String, Vec<PolicyVariant>>,
    len: usize,
}

impl Registry {
    /// Load every policy file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let registry = Self::from_specs(load_policy_dir(dir)?)?;
        tracing::info!(
            dir = %dir.display(),
            commands = registry.commands.len(),
            variants = registry.len,
            "loaded command policies"
        );
        Ok(registry)
    }

    /// Build from a single YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_specs(parse_policy_str("<inline>", text)?)
    }

    /// Compile and index records.
    ///
    /// # Errors
    ///
    /// Fails on the first record that does not compile, or if there are no
    /// records at all. No partial registry is returned.
    pub fn from_specs(specs: impl IntoIterator<Item = VariantSpec>) -> Result<Self, ConfigError> {
        let variants = specs
            .into_iter()
            .map(VariantSpec::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_variants(variants)
    }

    /// Index already-compiled variants.
    pub fn from_variants(
        variants: impl IntoIterator<Item = PolicyVariant>,
    ) -> Result<Self, ConfigError> {
        let mut commands: HashMap<String, Vec<PolicyVariant>> = HashMap::new();
        let mut len = 0;
        for variant in variants {
            commands
                .entry(variant.command().to_string())
                .or_default()
                .push(variant);
            len += 1;
        }

        if len == 0 {
            return Err(ConfigError::NoVariants);
        }

        Ok(Self { commands, len })
    }

    /// Variants registered under `command`, in definition order.
    ///
    /// Empty if the command is unknown.
    pub fn variants(&self, command: &str) -> &[PolicyVariant] {
        self.commands
            .get(command)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total number of variants.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a successfully built registry.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
