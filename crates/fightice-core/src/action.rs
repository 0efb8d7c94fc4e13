//! The discrete action table
//!
//! FightingICE exposes a fixed set of 56 named moves. The table below keeps
//! the engine's canonical ordering; action indices on the wire are positions
//! in this table.

use serde::{Deserialize, Serialize};

use crate::error::{FightIceError, Result};

/// Canonical move names, in engine order.
pub const ACTION_NAMES: [&str; 56] = [
    "AIR",
    "AIR_A",
    "AIR_B",
    "AIR_D_DB_BA",
    "AIR_D_DB_BB",
    "AIR_D_DF_FA",
    "AIR_D_DF_FB",
    "AIR_DA",
    "AIR_DB",
    "AIR_F_D_DFA",
    "AIR_F_D_DFB",
    "AIR_FA",
    "AIR_FB",
    "AIR_GUARD",
    "AIR_GUARD_RECOV",
    "AIR_RECOV",
    "AIR_UA",
    "AIR_UB",
    "BACK_JUMP",
    "BACK_STEP",
    "CHANGE_DOWN",
    "CROUCH",
    "CROUCH_A",
    "CROUCH_B",
    "CROUCH_FA",
    "CROUCH_FB",
    "CROUCH_GUARD",
    "CROUCH_GUARD_RECOV",
    "CROUCH_RECOV",
    "DASH",
    "DOWN",
    "FOR_JUMP",
    "FORWARD_WALK",
    "JUMP",
    "LANDING",
    "NEUTRAL",
    "RISE",
    "STAND",
    "STAND_A",
    "STAND_B",
    "STAND_D_DB_BA",
    "STAND_D_DB_BB",
    "STAND_D_DF_FA",
    "STAND_D_DF_FB",
    "STAND_D_DF_FC",
    "STAND_F_D_DFA",
    "STAND_F_D_DFB",
    "STAND_FA",
    "STAND_FB",
    "STAND_GUARD",
    "STAND_GUARD_RECOV",
    "STAND_RECOV",
    "THROW_A",
    "THROW_B",
    "THROW_HIT",
    "THROW_SUFFER",
];

/// A validated index into [`ACTION_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(usize);

impl ActionId {
    /// The do-nothing move, returned to the game while no step is pending.
    pub const NEUTRAL: ActionId = ActionId(35);

    /// Validate a raw index from the caller.
    pub fn new(index: usize) -> Result<Self> {
        if index < ACTION_NAMES.len() {
            Ok(Self(index))
        } else {
            Err(FightIceError::InvalidAction(index))
        }
    }

    /// Look up an action by its move name.
    pub fn from_name(name: &str) -> Option<Self> {
        ACTION_NAMES.iter().position(|n| *n == name).map(Self)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn name(self) -> &'static str {
        ACTION_NAMES[self.0]
    }
}

/// Description of the environment's discrete action space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpace {
    /// Number of discrete actions
    pub n: usize,
    /// Move names, index-aligned
    pub names: Vec<String>,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self {
            n: ACTION_NAMES.len(),
            names: ACTION_NAMES.iter().map(|n| n.to_string()).collect(),
        }
    }
}
