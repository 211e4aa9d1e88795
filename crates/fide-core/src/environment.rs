//! Companion application environment composition.
//!
//! Spawned shells learn about the optional companion application through a
//! single variable, `<ROOT_PREFIX>_API_APP__VERSION_NAME`. The composer
//! decides whether that variable should be exported and with which value.
//!
//! Absence is never an error here: every "nothing to add" case is `None`
//! and callers need no error handling to tell them apart from success.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DomainError, DomainResult, PackageInspector};

/// Default root prefix for exported variables.
pub const DEFAULT_ENV_PREFIX_ROOT: &str = "TERMUX";

/// Default package id of the companion application.
pub const DEFAULT_COMPANION_PACKAGE: &str = "com.termux.api";

/// Infix between the root prefix and companion variable names.
const COMPANION_ENV_INFIX: &str = "_API_APP__";

/// Suffix of the companion version variable.
const VERSION_NAME_SUFFIX: &str = "VERSION_NAME";

// ============================================================================
// Environment Mapping
// ============================================================================

/// Variables to merge into a child process environment.
///
/// Keys are unique. Iteration is sorted by key so output is deterministic,
/// but callers must not rely on any particular order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMapping(BTreeMap<String, String>);

impl EnvironmentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a variable, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the mapping as `KEY=VALUE` entries, the shape an exec call expects.
    pub fn to_environ(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Merges the mapping into a child command's environment.
    pub fn apply_to(&self, command: &mut tokio::process::Command) {
        command.envs(self.0.iter());
    }
}

/// Inserts `key` only when `value` is present and non-empty.
///
/// Returns true if the variable was set.
pub fn put_if_set(env: &mut EnvironmentMapping, key: &str, value: Option<&str>) -> bool {
    match value {
        Some(v) if !v.is_empty() => {
            env.insert(key, v);
            true
        }
        _ => false,
    }
}

/// Checks a variable name against the POSIX portable form:
/// ASCII alphanumerics and underscores, not starting with a digit.
pub fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Environment Composer
// ============================================================================

/// Builds the companion application environment for spawned shells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentComposer {
    root_prefix: String,
    package_id: String,
}

impl EnvironmentComposer {
    /// Creates a composer for the given root prefix and companion package.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidVariableName` if the prefix would not
    /// produce a valid variable name, and `DomainError::InvalidPackageId`
    /// if the package id is blank.
    pub fn new(root_prefix: impl Into<String>, package_id: impl Into<String>) -> DomainResult<Self> {
        let root_prefix = root_prefix.into();
        if !is_valid_variable_name(&root_prefix) {
            return Err(DomainError::InvalidVariableName { name: root_prefix });
        }
        let package_id = package_id.into();
        if package_id.trim().is_empty() {
            return Err(DomainError::InvalidPackageId { value: package_id });
        }
        Ok(Self {
            root_prefix,
            package_id,
        })
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Prefix shared by all companion variables, e.g. `TERMUX_API_APP__`.
    pub fn companion_env_prefix(&self) -> String {
        format!("{}{COMPANION_ENV_INFIX}", self.root_prefix)
    }

    /// Name of the companion version variable, e.g. `TERMUX_API_APP__VERSION_NAME`.
    pub fn version_variable(&self) -> String {
        format!("{}{VERSION_NAME_SUFFIX}", self.companion_env_prefix())
    }

    /// Composes the companion environment.
    ///
    /// Returns `None` when the companion already reports itself or is not
    /// installed. An installed companion without a usable version yields an
    /// empty mapping, since its install state was still determined.
    pub fn compose_companion_environment(
        &self,
        inspector: &dyn PackageInspector,
    ) -> Option<EnvironmentMapping> {
        if inspector.is_companion_active() {
            debug!(
                package = %self.package_id,
                "Companion already self-reporting, skipping environment"
            );
            return None;
        }

        let descriptor = inspector.describe(&self.package_id);
        if !descriptor.installed {
            debug!(package = %self.package_id, "Companion not installed");
            return None;
        }

        let mut env = EnvironmentMapping::new();
        if !put_if_set(&mut env, &self.version_variable(), descriptor.version_name()) {
            debug!(
                package = %self.package_id,
                "Companion installed without a version name"
            );
        }
        Some(env)
    }
}

impl Default for EnvironmentComposer {
    fn default() -> Self {
        Self {
            root_prefix: DEFAULT_ENV_PREFIX_ROOT.to_string(),
            package_id: DEFAULT_COMPANION_PACKAGE.to_string(),
        }
    }
}
