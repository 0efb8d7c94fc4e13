//! # fightice-env
//!
//! The synchronous RL environment over a FightingICE game process:
//! - [`channel`]: the one-in-flight frame channel between caller and observer
//! - [`observer`]: the player handlers driven by the game's frame callbacks
//! - [`driver`]: the background thread pumping one match to completion
//! - [`process`]: shared ownership of the launched game process
//! - [`session`]: the supervisor implementing reset/step/close
//!
//! A session's public surface is fully synchronous; bridge IO runs on a
//! session-owned tokio runtime underneath.

pub mod channel;
pub mod driver;
pub mod observer;
pub mod process;
pub mod session;

pub use channel::{CallerEndpoint, HandlerEndpoint, frame_channel};
pub use driver::spawn_match_driver;
pub use observer::{ChannelObserver, Opponent};
pub use process::SharedGameProcess;
pub use session::{EnvConfig, PeerHandle, SessionState, SessionSupervisor};

pub use fightice_core::{ActionSpace, Observation, StepInfo, StepOutcome, StepStatus};
