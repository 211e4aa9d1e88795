//! fide Core - Shared types for session/process binding
//!
//! This crate provides the domain types shared between the session
//! registry (fided) and whatever layer spawns shell processes:
//! - `session` - session identities and their execution records
//! - `package` - the package inspection capability and its snapshots
//! - `environment` - companion application environment composition
//! - `observer` - the spawn notification capability
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod environment;
pub mod error;
pub mod observer;
pub mod package;
pub mod session;

// Re-exports for convenience
pub use environment::{
    put_if_set, EnvironmentComposer, EnvironmentMapping, DEFAULT_COMPANION_PACKAGE,
    DEFAULT_ENV_PREFIX_ROOT,
};
pub use error::{DomainError, DomainResult};
pub use observer::SessionProcessObserver;
pub use package::{PackageDescriptor, PackageInspector};
pub use session::{ExecutionRecord, SessionId};
