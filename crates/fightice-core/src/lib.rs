//! # fightice-core
//!
//! Core types for the FightingICE RL environment:
//! - The 56-move discrete action table
//! - Observation and step-outcome types
//! - Frame-channel messages and per-frame game state
//! - Error taxonomy

pub mod action;
pub mod error;
pub mod frame;
pub mod observation;

pub use action::{ACTION_NAMES, ActionId, ActionSpace};
pub use error::{FightIceError, Result};
pub use frame::{FrameMessage, FrameState};
pub use observation::{Observation, StepInfo, StepOutcome, StepStatus};
