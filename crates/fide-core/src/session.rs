//! Session identities and per-session execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DomainError, DomainResult};

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Opaque identifier for one logical terminal session.
///
/// Sessions are created and named by the terminal multiplexer. The core
/// only compares and hashes these handles, it never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Prefix used for session IDs minted by the fide launcher itself.
pub const LAUNCHER_SESSION_PREFIX: &str = "fide-";

impl SessionId {
    /// Creates a new SessionId from a string.
    ///
    /// Note: no validation happens here. Use [`SessionId::parse`] for
    /// identities coming from user input.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses a session identity from user input.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSessionId` if the input is empty or
    /// contains whitespace.
    pub fn parse(id: &str) -> DomainResult<Self> {
        if id.is_empty() {
            return Err(DomainError::InvalidSessionId {
                value: id.to_string(),
                reason: "empty".to_string(),
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidSessionId {
                value: id.to_string(),
                reason: "contains whitespace".to_string(),
            });
        }
        Ok(Self(id.to_string()))
    }

    /// Mints a launcher-owned identity from the launcher's pid and a timestamp.
    pub fn for_launch(launcher_pid: u32, at: DateTime<Utc>) -> Self {
        Self(format!(
            "{LAUNCHER_SESSION_PREFIX}{launcher_pid}-{}",
            at.timestamp_nanos_opt().unwrap_or_else(|| at.timestamp_micros())
        ))
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Execution Record
// ============================================================================

/// Mutable execution state tracked for one registered session.
///
/// Owned by the session registry. Everything handed out to callers is a
/// cloned snapshot, so a reader sees either no process id or a complete one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// The session this record belongs to (non-owning back-reference)
    pub session: SessionId,

    /// OS process id of the session's shell, unset until spawning completes
    pub process_id: Option<u32>,

    /// When the session was registered
    pub registered_at: DateTime<Utc>,

    /// When the process id was last bound
    pub bound_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// Creates a record for a freshly registered session with no process id.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            process_id: None,
            registered_at: Utc::now(),
            bound_at: None,
        }
    }

    /// Stores the spawned process id.
    ///
    /// Returns the previously bound id, if any. Rebinding is tolerated
    /// (last write wins) but is not part of the normal lifecycle.
    pub fn bind_process(&mut self, pid: u32) -> Option<u32> {
        let previous = self.process_id.replace(pid);
        self.bound_at = Some(Utc::now());
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_id_parse() {
        assert_eq!(SessionId::parse("abc").unwrap().as_str(), "abc");
        assert!(matches!(
            SessionId::parse(""),
            Err(DomainError::InvalidSessionId { .. })
        ));
        assert!(SessionId::parse("a b").is_err());
    }

    #[test]
    fn test_session_id_for_launch() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let id = SessionId::for_launch(42, at);
        assert!(id.as_str().starts_with("fide-42-"));
        assert_ne!(id, SessionId::for_launch(43, at));
    }

    #[test]
    fn test_session_id_serde_transparent() {
        let id = SessionId::new("s-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"s-1\"");
    }

    #[test]
    fn test_new_record_is_unbound() {
        let record = ExecutionRecord::new(SessionId::new("s-1"));
        assert_eq!(record.process_id, None);
        assert!(record.bound_at.is_none());
    }

    #[test]
    fn test_bind_process_last_write_wins() {
        let mut record = ExecutionRecord::new(SessionId::new("s-1"));

        assert_eq!(record.bind_process(4242), None);
        assert_eq!(record.process_id, Some(4242));
        assert!(record.bound_at.is_some());

        assert_eq!(record.bind_process(4343), Some(4242));
        assert_eq!(record.process_id, Some(4343));
    }
}
