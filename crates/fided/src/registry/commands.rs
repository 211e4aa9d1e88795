//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `BindOutcome`: What a spawn notification did to the registry
//! - `RegistryEvent`: Events published by the registry for subscribers

use fide_core::{ExecutionRecord, SessionId};
use thiserror::Error;
use tokio::sync::oneshot;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command carries a oneshot channel for its response, so callers
/// get request-response semantics without sharing the session map.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a session with a fresh, unbound execution record.
    ///
    /// # Errors
    /// - `RegistryError::DuplicateSession` if the session is already registered
    /// - `RegistryError::RegistryFull` if at maximum capacity
    Register {
        /// The session to register
        session: SessionId,
        /// Channel to send the new record snapshot
        respond_to: oneshot::Sender<Result<ExecutionRecord, RegistryError>>,
    },

    /// Store a spawned process id on a session's record.
    ///
    /// Never fails: an unknown session is reported as `BindOutcome::SessionGone`.
    BindProcess {
        /// The session whose shell was spawned
        session: SessionId,
        /// OS process id of the shell
        pid: u32,
        /// Channel to send the outcome
        respond_to: oneshot::Sender<BindOutcome>,
    },

    /// Get a snapshot of a single session's record.
    ///
    /// Returns `None` if the session isn't registered.
    Lookup {
        /// The session to look up
        session: SessionId,
        /// Channel to send the result
        respond_to: oneshot::Sender<Option<ExecutionRecord>>,
    },

    /// Get snapshots of all records.
    GetAll {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<ExecutionRecord>>,
    },

    /// Remove a session's record.
    ///
    /// Idempotent: removing an unknown session is not an error.
    Unregister {
        /// The session to remove
        session: SessionId,
        /// Channel to send whether a record was actually removed
        respond_to: oneshot::Sender<bool>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The session is already registered.
    ///
    /// This points at a lifecycle bug in the caller and must not be ignored.
    #[error("session already registered: {0}")]
    DuplicateSession(SessionId),

    /// The registry has reached its maximum session capacity.
    #[error("registry is full (max: {max} sessions)")]
    RegistryFull {
        /// Maximum number of sessions allowed
        max: usize,
    },

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Bind Outcome
// ============================================================================

/// Result of applying a spawn notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The process id was stored on a previously unbound record.
    Bound,

    /// The record already had a process id; the new one replaced it.
    Rebound {
        /// The process id that was overwritten
        previous: u32,
    },

    /// The session was unregistered before the notification arrived.
    SessionGone,
}

impl std::fmt::Display for BindOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bound => write!(f, "bound"),
            Self::Rebound { previous } => write!(f, "rebound (previous pid {previous})"),
            Self::SessionGone => write!(f, "session gone"),
        }
    }
}

// ============================================================================
// Registry Events
// ============================================================================

/// Events published by the registry to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A session was registered.
    Registered {
        /// ID of the registered session
        session: SessionId,
    },

    /// A session's shell process id was stored.
    ProcessBound {
        /// ID of the session
        session: SessionId,
        /// The bound process id
        pid: u32,
    },

    /// A session was removed from the registry.
    Unregistered {
        /// ID of the removed session
        session: SessionId,
    },
}
