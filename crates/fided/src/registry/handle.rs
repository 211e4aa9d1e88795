//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` is a cheap-to-clone interface for sending commands
//! to the registry actor and subscribing to registry events. It is also the
//! spawn-notification observer: the layer that forks shells can be handed a
//! clone and report pids straight into the registry.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RegistryError::ChannelClosed` or folded
//!   into absent results

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use fide_core::{ExecutionRecord, SessionId, SessionProcessObserver};

use super::commands::{BindOutcome, RegistryCommand, RegistryError, RegistryEvent};

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// All methods are async and communicate with the actor via channels.
///
/// # Usage
///
/// ```ignore
/// let handle = spawn_registry();
///
/// // Session lifecycle path
/// handle.register(session.clone()).await?;
///
/// // Spawn completion path
/// handle.on_process_spawned(session.clone(), pid).await;
///
/// // Anyone
/// let record = handle.lookup(session).await;
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    pub fn new(
        sender: mpsc::Sender<RegistryCommand>,
        event_sender: broadcast::Sender<RegistryEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Register a session and return a snapshot of its fresh record.
    ///
    /// # Errors
    ///
    /// - `RegistryError::DuplicateSession` if the session is already registered
    /// - `RegistryError::RegistryFull` if the registry is at maximum capacity
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register(&self, session: SessionId) -> Result<ExecutionRecord, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Register {
                session,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Store a spawned process id on a session's record.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn bind_process(
        &self,
        session: SessionId,
        pid: u32,
    ) -> Result<BindOutcome, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::BindProcess {
                session,
                pid,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Get a snapshot of a session's record.
    ///
    /// Returns `None` if the session isn't registered or if communication
    /// with the actor fails.
    pub async fn lookup(&self, session: SessionId) -> Option<ExecutionRecord> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Lookup {
                session,
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Get snapshots of all records.
    ///
    /// Returns an empty vector if no sessions are registered or if
    /// communication with the actor fails.
    pub async fn all_records(&self) -> Vec<ExecutionRecord> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::GetAll { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.all_records().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove a session's record.
    ///
    /// Idempotent. Returns `true` if a record was removed, `false` if the
    /// session was unknown or the actor has shut down.
    pub async fn unregister(&self, session: SessionId) -> bool {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Unregister {
                session,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            debug!("Unregister dropped: registry channel closed");
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Subscribe to registry events.
    ///
    /// This is a synchronous operation - it doesn't communicate with the actor.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still running.
    ///
    /// Returns `true` if the command channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[async_trait]
impl SessionProcessObserver for RegistryHandle {
    async fn on_process_spawned(&self, session: SessionId, pid: u32) {
        match self.bind_process(session.clone(), pid).await {
            Ok(BindOutcome::SessionGone) => {
                debug!(session_id = %session, pid, "Session ended before its process was reported");
            }
            Ok(_) => {}
            Err(e) => {
                debug!(session_id = %session, pid, error = %e, "Spawn notification dropped");
            }
        }
    }
}
