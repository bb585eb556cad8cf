//! Error taxonomy for the player.
//!
//! Every failure is terminal for the session; there is no retry policy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    /// One-time setup failed before the decode loop started.
    #[error("setup failed while {operation}: {reason}")]
    Setup { operation: String, reason: String },

    /// The decode loop failed mid-session.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl PlayerError {
    pub fn setup(operation: impl Into<String>, reason: impl ToString) -> Self {
        PlayerError::Setup {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn playback(reason: impl ToString) -> Self {
        PlayerError::Playback(reason.to_string())
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, PlayerError::Setup { .. })
    }
}
