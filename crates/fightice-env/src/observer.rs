//! Player handlers driven by the game's frame callbacks
//!
//! `ChannelObserver` is the environment's own player: each frame callback
//! first delivers the observation tuple owed for the previous command, then
//! blocks for the caller's next command and answers the game with its
//! action. `Opponent` picks what sits on the other side of the match.

use std::sync::{Arc, Mutex};

use fightice_bridge::FrameObserver;
use fightice_core::{ActionId, FrameMessage, FrameState, Result, StepOutcome, StepStatus};
use tracing::debug;

use crate::channel::HandlerEndpoint;

type SharedEndpoint = Arc<Mutex<HandlerEndpoint>>;

/// Player handler that relays frames to a synchronous caller.
///
/// The endpoint is shared behind an `Arc` so a replacement observer built
/// after a forced restart keeps serving the same caller.
pub struct ChannelObserver {
    name: String,
    link: SharedEndpoint,
    /// Whether a command has been taken whose observation is still owed
    pending: bool,
}

impl ChannelObserver {
    pub fn new(name: impl Into<String>, endpoint: HandlerEndpoint) -> Self {
        Self::from_link(name, Arc::new(Mutex::new(endpoint)))
    }

    pub fn from_link(name: impl Into<String>, link: SharedEndpoint) -> Self {
        Self {
            name: name.into(),
            link,
            pending: false,
        }
    }

    /// Share the endpoint for building replacement observers.
    pub fn link(&self) -> SharedEndpoint {
        self.link.clone()
    }

    fn deliver(&self, state: &FrameState, status: StepStatus) -> Result<()> {
        let outcome = StepOutcome {
            observation: state.observation(),
            reward: state.reward,
            status,
            info: Default::default(),
        };
        self.endpoint().send(outcome)
    }

    fn endpoint(&self) -> std::sync::MutexGuard<'_, HandlerEndpoint> {
        self.link.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FrameObserver for ChannelObserver {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_frame(&mut self, state: FrameState) -> Result<ActionId> {
        if self.pending {
            let status = if state.round_over || state.match_over {
                StepStatus::Terminated
            } else {
                StepStatus::Continuing
            };
            self.deliver(&state, status)?;
            self.pending = false;
        }

        // Blocks until the caller issues the next command; the game waits on
        // our reply meanwhile.
        let command = self.endpoint().recv()?;
        self.pending = true;
        match command {
            FrameMessage::Reset => Ok(ActionId::NEUTRAL),
            FrameMessage::Step { action } => Ok(action),
            FrameMessage::Observation { .. } => unreachable!("filtered by HandlerEndpoint::recv"),
        }
    }

    fn on_round_end(&mut self, state: FrameState) {
        if self.pending {
            if self.deliver(&state, StepStatus::Terminated).is_err() {
                debug!(name = %self.name, "caller gone at round end");
            }
            self.pending = false;
        }
    }
}

type ObserverFactory = Arc<dyn Fn() -> Box<dyn FrameObserver> + Send + Sync>;

/// The second player of a match.
pub enum Opponent {
    /// Scripted AI living inside the game process, addressed by class name
    Builtin(String),
    /// Locally implemented AI, registered on the callback channel like
    /// player 1. The factory is re-invoked after each forced restart.
    Local(ObserverFactory),
}

impl Opponent {
    pub fn builtin(name: impl Into<String>) -> Self {
        Opponent::Builtin(name.into())
    }

    pub fn local<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn FrameObserver> + Send + Sync + 'static,
    {
        Opponent::Local(Arc::new(factory))
    }
}

impl std::fmt::Debug for Opponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opponent::Builtin(name) => f.debug_tuple("Builtin").field(name).finish(),
            Opponent::Local(_) => f.write_str("Local(..)"),
        }
    }
}
