// ── Typed commands routed to the bridge's processor task ──

use tokio::sync::oneshot;

use crate::error::CoreError;
use crate::model::{LockId, LockState};

/// Mutation requests accepted by the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive a lock to the desired bolt state over the bridge.
    SetLockState { id: LockId, desired: LockState },
}

/// Result of a successfully dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The cloud accepted the operation; `status` echoes its reported
    /// bolt state, when present. The settled state is confirmed by the
    /// accelerated poll that follows.
    Operated { status: Option<String> },
}

/// A command plus the channel its result travels back on.
pub struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}
