//! Session registry using Actor pattern.
//!
//! The registry is the only shared mutable state in fided. It maps each
//! live session to its execution record, and it is fed by two independent
//! paths that may race each other freely.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Session lifecycle│──register/unregister──┐
//! └──────────────────┘                       ▼
//!                                   ┌─────────────────┐     ┌──────────────────┐
//!                                   │  RegistryActor  │────▶│ Broadcast Channel│
//!                                   └─────────────────┘     └──────────────────┘
//! ┌──────────────────┐                       ▲                       │
//! │ Spawn completion │──on_process_spawned───┘                       ▼
//! └──────────────────┘   (RegistryCommand, mpsc)              RegistryEvent
//!                                                             subscribers
//! ```
//!
//! A spawn notification that arrives after its session was unregistered is
//! a no-op. Unregistering is the only way to "cancel" a pending spawn.

use tokio::sync::{broadcast, mpsc};

mod actor;
mod commands;
mod handle;

pub use actor::{RegistryActor, MAX_SESSIONS};
pub use commands::{BindOutcome, RegistryCommand, RegistryError, RegistryEvent};
pub use handle::RegistryHandle;

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// Spawn the registry actor with the default capacity and return a handle.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```no_run
/// use fided::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///
///     let records = handle.all_records().await;
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    spawn_registry_with_capacity(MAX_SESSIONS)
}

/// Spawn the registry actor with a custom session capacity.
pub fn spawn_registry_with_capacity(max_sessions: usize) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = RegistryActor::new(cmd_rx, event_tx.clone(), max_sessions);
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx, event_tx)
}
