//! Error types for the FightingICE environment

use thiserror::Error;

/// Result type for environment operations
pub type Result<T> = std::result::Result<T, FightIceError>;

/// Environment error taxonomy
#[derive(Debug, Error)]
pub enum FightIceError {
    /// Bad install layout or missing runtime, detected before any launch
    #[error("configuration error: {0}")]
    Config(String),

    /// Spawning the game process failed
    #[error("failed to launch game process: {0}")]
    Launch(String),

    /// Transport-level failure on the gateway or callback channel
    #[error("ipc error: {0}")]
    Ipc(String),

    /// Peer sent something outside the protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Message could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Callback referenced an unregistered handler name
    #[error("no handler registered as {0:?}")]
    HandlerNotRegistered(String),

    /// Action index outside the 56-move table
    #[error("action index out of range: {0}")]
    InvalidAction(usize),

    /// The game process died or the bridge broke mid-match
    #[error("game crashed: {0}")]
    GameCrashed(String),

    /// A forced periodic relaunch failed; the session cannot continue
    #[error("could not restart game: {0}")]
    RestartFailed(String),

    /// The frame channel's peer endpoint is gone
    #[error("frame channel closed")]
    ChannelClosed,
}

impl FightIceError {
    /// Whether the session is unrecoverable after this error.
    ///
    /// Transient crashes are surfaced through the degraded step outcome and
    /// recovered by the next `reset`; configuration and forced-restart
    /// failures are not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FightIceError::Config(_) | FightIceError::RestartFailed(_)
        )
    }
}

impl From<serde_json::Error> for FightIceError {
    fn from(err: serde_json::Error) -> Self {
        FightIceError::Serialization(err.to_string())
    }
}
