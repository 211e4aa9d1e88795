//! Package inspection capability.
//!
//! The core never talks to a package manager itself. Whatever hosts it
//! injects a [`PackageInspector`] that answers two questions: is the
//! companion application already reporting itself, and what is installed
//! under a given package id.

use serde::{Deserialize, Serialize};

/// Snapshot of a package's install state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Whether the package is installed
    pub installed: bool,

    /// Version name reported by the package manager, if any
    pub version: Option<String>,
}

impl PackageDescriptor {
    /// Descriptor for a package that is not installed.
    pub fn not_installed() -> Self {
        Self {
            installed: false,
            version: None,
        }
    }

    /// Descriptor for an installed package.
    pub fn installed(version: Option<String>) -> Self {
        Self {
            installed: true,
            version,
        }
    }

    /// Returns the version name if it is present and non-empty.
    pub fn version_name(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

/// Capability for querying installed packages.
///
/// Implementations may block briefly on a system query. Neither method can
/// fail: an unreachable package manager is reported as "not installed" and
/// an unknown activity state as "not active".
pub trait PackageInspector: Send + Sync {
    /// Whether the companion application already exposes its own
    /// environment through an independent channel.
    fn is_companion_active(&self) -> bool;

    /// Describes the package registered under `package_id`.
    fn describe(&self, package_id: &str) -> PackageDescriptor;
}

impl<T: PackageInspector + ?Sized> PackageInspector for &T {
    fn is_companion_active(&self) -> bool {
        (**self).is_companion_active()
    }

    fn describe(&self, package_id: &str) -> PackageDescriptor {
        (**self).describe(package_id)
    }
}

impl<T: PackageInspector + ?Sized> PackageInspector for std::sync::Arc<T> {
    fn is_companion_active(&self) -> bool {
        (**self).is_companion_active()
    }

    fn describe(&self, package_id: &str) -> PackageDescriptor {
        (**self).describe(package_id)
    }
}
