//! Registry actor - owns all execution records and processes commands.
//!
//! The RegistryActor is the single owner of session state. Commands from
//! the session-lifecycle path and the spawn-notification path arrive on
//! the same mpsc channel and are applied one at a time, which is the only
//! synchronization the records need.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Response send failures are ignored (the caller gave up waiting)

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use fide_core::{ExecutionRecord, SessionId};

use super::commands::{BindOutcome, RegistryCommand, RegistryError, RegistryEvent};

/// Default maximum number of sessions the registry can hold.
pub const MAX_SESSIONS: usize = 100;

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns every session's execution record.
///
/// Runs in a single task and processes commands sequentially, so a bind
/// and any later lookup of the same session are always ordered.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Execution records keyed by session
    records: HashMap<SessionId, ExecutionRecord>,

    /// Capacity limit
    max_sessions: usize,

    /// Event publisher for subscribers
    event_publisher: broadcast::Sender<RegistryEvent>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `event_publisher` - Broadcast channel for publishing events
    /// * `max_sessions` - Capacity limit for registered sessions
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<RegistryEvent>,
        max_sessions: usize,
    ) -> Self {
        Self {
            receiver,
            records: HashMap::new(),
            max_sessions,
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    pub async fn run(mut self) {
        info!(max_sessions = self.max_sessions, "Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(sessions = self.records.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                session,
                respond_to,
            } => {
                let result = self.handle_register(session);
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::BindProcess {
                session,
                pid,
                respond_to,
            } => {
                let outcome = self.handle_bind_process(session, pid);
                let _ = respond_to.send(outcome);
            }
            RegistryCommand::Lookup {
                session,
                respond_to,
            } => {
                let _ = respond_to.send(self.records.get(&session).cloned());
            }
            RegistryCommand::GetAll { respond_to } => {
                let _ = respond_to.send(self.records.values().cloned().collect());
            }
            RegistryCommand::Unregister {
                session,
                respond_to,
            } => {
                let removed = self.handle_unregister(session);
                let _ = respond_to.send(removed);
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(&mut self, session: SessionId) -> Result<ExecutionRecord, RegistryError> {
        if self.records.contains_key(&session) {
            warn!(session_id = %session, "Session already registered, rejecting registration");
            return Err(RegistryError::DuplicateSession(session));
        }

        if self.records.len() >= self.max_sessions {
            warn!(
                session_id = %session,
                current = self.records.len(),
                max = self.max_sessions,
                "Registry is full, rejecting registration"
            );
            return Err(RegistryError::RegistryFull {
                max: self.max_sessions,
            });
        }

        let record = ExecutionRecord::new(session.clone());
        self.records.insert(session.clone(), record.clone());

        info!(
            session_id = %session,
            total_sessions = self.records.len(),
            "Session registered"
        );

        // Publish event (ignore if no subscribers)
        let _ = self.event_publisher.send(RegistryEvent::Registered { session });

        Ok(record)
    }

    /// Applies a spawn notification.
    ///
    /// A missing session means it terminated before its shell finished
    /// spawning. That race is expected, so nothing is inserted.
    fn handle_bind_process(&mut self, session: SessionId, pid: u32) -> BindOutcome {
        let Some(record) = self.records.get_mut(&session) else {
            debug!(
                session_id = %session,
                pid,
                "Spawn notification for unregistered session, ignoring"
            );
            return BindOutcome::SessionGone;
        };

        let outcome = match record.bind_process(pid) {
            None => {
                info!(session_id = %session, pid, "Session process bound");
                BindOutcome::Bound
            }
            Some(previous) => {
                warn!(
                    session_id = %session,
                    pid,
                    previous,
                    "Session process rebound"
                );
                BindOutcome::Rebound { previous }
            }
        };

        let _ = self
            .event_publisher
            .send(RegistryEvent::ProcessBound { session, pid });

        outcome
    }

    fn handle_unregister(&mut self, session: SessionId) -> bool {
        match self.records.remove(&session) {
            Some(record) => {
                info!(
                    session_id = %session,
                    pid = ?record.process_id,
                    remaining = self.records.len(),
                    "Session unregistered"
                );
                let _ = self
                    .event_publisher
                    .send(RegistryEvent::Unregistered { session });
                true
            }
            None => {
                debug!(session_id = %session, "Unregister for unknown session, ignoring");
                false
            }
        }
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn create_actor_with_capacity(
        max: usize,
    ) -> (
        mpsc::Sender<RegistryCommand>,
        RegistryActor,
        broadcast::Receiver<RegistryEvent>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = broadcast::channel(16);
        let actor = RegistryActor::new(cmd_rx, event_tx, max);
        (cmd_tx, actor, event_rx)
    }

    fn create_actor() -> (
        mpsc::Sender<RegistryCommand>,
        RegistryActor,
        broadcast::Receiver<RegistryEvent>,
    ) {
        create_actor_with_capacity(MAX_SESSIONS)
    }

    fn register(actor: &mut RegistryActor, id: &str) -> oneshot::Receiver<Result<ExecutionRecord, RegistryError>> {
        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Register {
            session: SessionId::new(id),
            respond_to: tx,
        });
        rx
    }

    fn bind(actor: &mut RegistryActor, id: &str, pid: u32) -> oneshot::Receiver<BindOutcome> {
        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::BindProcess {
            session: SessionId::new(id),
            pid,
            respond_to: tx,
        });
        rx
    }

    fn lookup(actor: &mut RegistryActor, id: &str) -> oneshot::Receiver<Option<ExecutionRecord>> {
        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Lookup {
            session: SessionId::new(id),
            respond_to: tx,
        });
        rx
    }

    fn unregister(actor: &mut RegistryActor, id: &str) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::Unregister {
            session: SessionId::new(id),
            respond_to: tx,
        });
        rx
    }

    #[tokio::test]
    async fn test_register_session() {
        let (cmd_tx, mut actor, mut event_rx) = create_actor();

        let (respond_tx, respond_rx) = oneshot::channel();
        cmd_tx
            .send(RegistryCommand::Register {
                session: SessionId::new("test-123"),
                respond_to: respond_tx,
            })
            .await
            .unwrap();

        // Process the command manually (actor not running in background)
        if let Some(cmd) = actor.receiver.recv().await {
            actor.handle_command(cmd);
        }

        let record = respond_rx.await.unwrap().unwrap();
        assert_eq!(record.session.as_str(), "test-123");
        assert_eq!(record.process_id, None);
        assert_eq!(actor.session_count(), 1);

        let event = event_rx.try_recv().unwrap();
        assert_eq!(
            event,
            RegistryEvent::Registered {
                session: SessionId::new("test-123")
            }
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let (_, mut actor, _) = create_actor();

        let _ = register(&mut actor, "test-123");
        let result = register(&mut actor, "test-123").await.unwrap();

        assert_eq!(
            result,
            Err(RegistryError::DuplicateSession(SessionId::new("test-123")))
        );
        assert_eq!(actor.session_count(), 1);
    }

    #[tokio::test]
    async fn test_register_full_fails() {
        let (_, mut actor, _) = create_actor_with_capacity(2);

        let _ = register(&mut actor, "a");
        let _ = register(&mut actor, "b");
        let result = register(&mut actor, "c").await.unwrap();

        assert_eq!(result, Err(RegistryError::RegistryFull { max: 2 }));
        assert_eq!(actor.session_count(), 2);
    }

    #[tokio::test]
    async fn test_bind_then_lookup() {
        let (_, mut actor, mut event_rx) = create_actor();

        let _ = register(&mut actor, "a");
        let _ = event_rx.try_recv();

        assert_eq!(bind(&mut actor, "a", 4242).await.unwrap(), BindOutcome::Bound);

        let record = lookup(&mut actor, "a").await.unwrap().unwrap();
        assert_eq!(record.process_id, Some(4242));
        assert!(record.bound_at.is_some());

        let event = event_rx.try_recv().unwrap();
        assert_eq!(
            event,
            RegistryEvent::ProcessBound {
                session: SessionId::new("a"),
                pid: 4242
            }
        );
    }

    #[tokio::test]
    async fn test_rebind_is_last_write_wins() {
        let (_, mut actor, _) = create_actor();

        let _ = register(&mut actor, "a");
        let _ = bind(&mut actor, "a", 1);

        assert_eq!(
            bind(&mut actor, "a", 2).await.unwrap(),
            BindOutcome::Rebound { previous: 1 }
        );
        let record = lookup(&mut actor, "a").await.unwrap().unwrap();
        assert_eq!(record.process_id, Some(2));
    }

    #[tokio::test]
    async fn test_bind_unknown_session_inserts_nothing() {
        let (_, mut actor, mut event_rx) = create_actor();

        assert_eq!(
            bind(&mut actor, "ghost", 7777).await.unwrap(),
            BindOutcome::SessionGone
        );
        assert_eq!(actor.session_count(), 0);
        assert!(lookup(&mut actor, "ghost").await.unwrap().is_none());
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_get_all() {
        let (_, mut actor, _) = create_actor();

        for i in 0..3 {
            let _ = register(&mut actor, &format!("test-{i}"));
        }

        let (tx, rx) = oneshot::channel();
        actor.handle_command(RegistryCommand::GetAll { respond_to: tx });

        assert_eq!(rx.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (_, mut actor, mut event_rx) = create_actor();

        let _ = register(&mut actor, "a");
        let _ = event_rx.try_recv();

        assert!(unregister(&mut actor, "a").await.unwrap());
        assert!(!unregister(&mut actor, "a").await.unwrap());
        assert!(!unregister(&mut actor, "never-registered").await.unwrap());
        assert_eq!(actor.session_count(), 0);

        // Only the first removal publishes an event
        assert_eq!(
            event_rx.try_recv().unwrap(),
            RegistryEvent::Unregistered {
                session: SessionId::new("a")
            }
        );
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_then_late_bind() {
        let (_, mut actor, _) = create_actor();

        let _ = register(&mut actor, "b");
        let _ = unregister(&mut actor, "b");

        assert_eq!(
            bind(&mut actor, "b", 7777).await.unwrap(),
            BindOutcome::SessionGone
        );
        assert!(lookup(&mut actor, "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reregister_after_unregister_starts_unbound() {
        let (_, mut actor, _) = create_actor();

        let _ = register(&mut actor, "a");
        let _ = bind(&mut actor, "a", 10);
        let _ = unregister(&mut actor, "a");

        let record = register(&mut actor, "a").await.unwrap().unwrap();
        assert_eq!(record.process_id, None);
    }

    #[tokio::test]
    async fn test_run_stops_when_senders_dropped() {
        let (cmd_tx, actor, _) = create_actor();
        let task = tokio::spawn(actor.run());

        drop(cmd_tx);

        task.await.unwrap();
    }
}
