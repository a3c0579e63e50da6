//! Notifications for audio and UI collaborators.

use crate::progression::RewardGrant;

/// Something the player should hear or see. Queued while the engine
/// processes a command and drained with [`crate::Game::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Two tiles merged into one of `value`.
    Merged { value: u32 },
    FellAsleep,
    /// No legal move is left on the board.
    Stuck,
    RewardGranted(RewardGrant),
    Undone,
    NothingToUndo,
    Purchased { id: String },
    Placed { id: String },
}
