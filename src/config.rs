//! Configuration: policy files and execution settings.
//!
//! Policies live in a directory of YAML files, each holding a sequence of
//! [`VariantSpec`] records. Files are read in file-name order so that
//! variants sharing a command name are tried in a stable order.

use crate::error::ConfigError;
use crate::namespace::NamespaceTarget;
use crate::policy::VariantSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File in every config directory that holds daemon settings, not policies.
const RESERVED_FILE: &str = "config";

/// Default relay chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Parse one policy document.
///
/// `origin` names the source in error messages. An empty document yields no
/// variants.
pub fn parse_policy_str(origin: &str, text: &str) -> Result<Vec<VariantSpec>, ConfigError> {
    let blank = text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---"
    });
    if blank {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

/// Read every policy file in `dir`.
///
/// Entries named `config`, non-regular files, and files without a `.yaml` or
/// `.yml` extension are skipped.
pub fn load_policy_dir(dir: &Path) -> Result<Vec<VariantSpec>, ConfigError> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_error(dir))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error(dir))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut specs = Vec::new();
    for entry in entries {
        let path = entry.path();

        if entry.file_name() == RESERVED_FILE {
            continue;
        }

        // Follow symlinks: mounted config maps are usually links.
        let metadata = std::fs::metadata(&path).map_err(io_error(&path))?;
        if !metadata.is_file() {
            tracing::debug!(path = %path.display(), "skipping non-file in policy dir");
            continue;
        }

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        );
        if !is_yaml {
            tracing::debug!(path = %path.display(), "skipping policy file with invalid suffix");
            continue;
        }

        let text = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        let loaded = parse_policy_str(&path.display().to_string(), &text)?;
        tracing::debug!(path = %path.display(), variants = loaded.len(), "loaded policy file");
        specs.extend(loaded);
    }

    Ok(specs)
}

/// Settings for the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExecConfig {
    /// The `nsenter` binary. A bare name is looked up on `PATH`.
    pub nsenter: PathBuf,

    /// Namespace target for variants that do not name one.
    pub default_target: NamespaceTarget,

    /// Maximum bytes relayed per sink call.
    pub chunk_size: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            nsenter: PathBuf::from("nsenter"),
            default_target: NamespaceTarget::INIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `nsenter` binary.
    pub fn nsenter(mut self, path: impl Into<PathBuf>) -> Self {
        self.nsenter = path.into();
        self
    }

    /// Set the default namespace target.
    pub fn default_target(mut self, target: NamespaceTarget) -> Self {
        self.default_target = target;
        self
    }

    /// Set the relay chunk size. Zero is treated as one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}
