//! Spawn notification capability.

use async_trait::async_trait;

use crate::SessionId;

/// Receives process-spawn completions from the layer that forks shells.
///
/// Notifications arrive on their own schedule, independent of the session
/// lifecycle. A notification for a session that has already gone away is
/// expected and must be absorbed silently, so the method has no failure
/// channel at all.
#[async_trait]
pub trait SessionProcessObserver: Send + Sync {
    /// Reports that the shell for `session` was spawned as process `pid`.
    async fn on_process_spawned(&self, session: SessionId, pid: u32);
}
