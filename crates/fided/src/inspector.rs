//! Package inspectors backing the companion environment.
//!
//! `CommandPackageInspector` asks the platform package manager by running
//! a command (by default `dumpsys package <id>`). All functions in this
//! module that run commands perform blocking I/O; async callers should use
//! `spawn_blocking`.

use std::process::Command;

use fide_core::{PackageDescriptor, PackageInspector};
use tracing::{debug, trace};

/// Default package query command. The package id is appended.
pub const DEFAULT_INSPECTOR_COMMAND: &[&str] = &["dumpsys", "package"];

/// Start of a per-package section header in a package dump.
const PACKAGE_HEADER_PREFIX: &str = "Package [";

// ============================================================================
// Command Inspector
// ============================================================================

/// Inspector that shells out to the package manager.
///
/// The companion counts as active when its version variable is already
/// present in the environment this process inherited, which means the
/// companion exported it itself.
#[derive(Debug, Clone)]
pub struct CommandPackageInspector {
    /// Program and leading arguments
    command: Vec<String>,

    /// Value of the companion version variable inherited from the parent
    self_reported_version: Option<String>,
}

impl CommandPackageInspector {
    pub fn new(command: Vec<String>, self_reported_version: Option<String>) -> Self {
        Self {
            command,
            self_reported_version,
        }
    }

    /// Builds an inspector that reads `version_variable` from this process's environment.
    pub fn from_process_env(command: Vec<String>, version_variable: &str) -> Self {
        let inherited = std::env::var(version_variable)
            .ok()
            .filter(|v| !v.is_empty());
        Self::new(command, inherited)
    }

    fn run_query(&self, package_id: &str) -> Option<String> {
        let (program, args) = self.command.split_first()?;

        let output = Command::new(program)
            .args(args)
            .arg(package_id)
            .output()
            .map_err(|e| debug!(program = %program, error = %e, "Package query failed to run"))
            .ok()?;

        if !output.status.success() {
            debug!(
                program = %program,
                status = ?output.status.code(),
                "Package query exited unsuccessfully"
            );
            return None;
        }

        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PackageInspector for CommandPackageInspector {
    fn is_companion_active(&self) -> bool {
        self.self_reported_version.is_some()
    }

    fn describe(&self, package_id: &str) -> PackageDescriptor {
        match self.run_query(package_id) {
            Some(dump) => parse_package_dump(&dump, package_id),
            None => PackageDescriptor::not_installed(),
        }
    }
}

/// Parses `dumpsys package` style output for one package.
///
/// Only the section under the `Package [<id>]` header is read; it ends at
/// the next `Package [` header. A `versionName=` line in that section marks
/// the package installed with that version, and the header alone still
/// counts as installed. Anything else, including "Unable to find package"
/// or another package's section, is not installed.
pub fn parse_package_dump(dump: &str, package_id: &str) -> PackageDescriptor {
    let header = format!("Package [{package_id}]");
    let mut seen_header = false;

    for line in dump.lines().map(str::trim) {
        if line.starts_with(PACKAGE_HEADER_PREFIX) {
            if seen_header {
                break;
            }
            seen_header = line.starts_with(&header);
            continue;
        }
        if !seen_header {
            continue;
        }
        if let Some(version) = line.strip_prefix("versionName=") {
            trace!(package = %package_id, version, "Found package version");
            return PackageDescriptor::installed(Some(version.trim().to_string()));
        }
    }

    if seen_header {
        PackageDescriptor::installed(None)
    } else {
        PackageDescriptor::not_installed()
    }
}

// ============================================================================
// Static Inspector
// ============================================================================

/// Inspector with fixed answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPackageInspector {
    /// Whether the companion reports itself as active
    pub active: bool,

    /// Descriptor returned for every package id
    pub descriptor: PackageDescriptor,
}

impl StaticPackageInspector {
    /// Companion installed with the given version, not active.
    pub fn installed(version: impl Into<String>) -> Self {
        Self {
            active: false,
            descriptor: PackageDescriptor::installed(Some(version.into())),
        }
    }

    /// Companion not installed.
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl PackageInspector for StaticPackageInspector {
    fn is_companion_active(&self) -> bool {
        self.active
    }

    fn describe(&self, _package_id: &str) -> PackageDescriptor {
        self.descriptor.clone()
    }
}
