//! Frame-channel messages and per-frame game state
//!
//! The frame channel is a strict one-request-one-response alternation: the
//! caller sends exactly one `Reset` or `Step` and then blocks for exactly one
//! `Observation`; the handler side mirrors this from within the game's frame
//! callbacks.

use serde::{Deserialize, Serialize};

use crate::action::ActionId;
use crate::observation::{Observation, StepOutcome};

/// Messages carried on the frame channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameMessage {
    /// Caller → handler: begin a new round
    Reset,
    /// Caller → handler: apply one action for one frame step
    Step { action: ActionId },
    /// Handler → caller: the observation tuple for the previous command
    Observation { outcome: StepOutcome },
}

/// What the game reports for one simulated frame.
///
/// `frame_data` is the collaborator-encoded observation payload; the
/// supervisor never looks inside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameState {
    #[serde(default)]
    pub frame_data: serde_json::Value,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub round_over: bool,
    #[serde(default)]
    pub match_over: bool,
}

impl FrameState {
    /// Decode the frame payload into an observation, preferring the vector
    /// form when the game sent a flat numeric array.
    pub fn observation(&self) -> Observation {
        if let Some(values) = self.frame_data.as_array() {
            if let Some(vector) = values
                .iter()
                .map(|v| v.as_f64())
                .collect::<Option<Vec<f64>>>()
            {
                return Observation::Vector(vector);
            }
        }
        Observation::Custom(self.frame_data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::StepStatus;

    #[test]
    fn step_message_wire_shape() {
        let msg = FrameMessage::Step {
            action: ActionId::new(22).unwrap(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"step","action":22}"#);
    }

    #[test]
    fn observation_message_round_trip() {
        let msg = FrameMessage::Observation {
            outcome: StepOutcome {
                observation: Observation::Vector(vec![1.0]),
                reward: -5.0,
                status: StepStatus::Terminated,
                info: Default::default(),
            },
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        match serde_json::from_slice(&bytes).unwrap() {
            FrameMessage::Observation { outcome } => {
                assert_eq!(outcome.reward, -5.0);
                assert_eq!(outcome.status, StepStatus::Terminated);
            }
            other => panic!("wrong message: {:?}", other),
        }
    }

    #[test]
    fn numeric_frame_data_decodes_to_vector() {
        let state = FrameState {
            frame_data: serde_json::json!([0.1, 0.2, 0.3]),
            ..Default::default()
        };
        assert_eq!(
            state.observation(),
            Observation::Vector(vec![0.1, 0.2, 0.3])
        );
    }

    #[test]
    fn opaque_frame_data_stays_custom() {
        let state = FrameState {
            frame_data: serde_json::json!({"pixels": "base64..."}),
            ..Default::default()
        };
        match state.observation() {
            Observation::Custom(v) => assert!(v.get("pixels").is_some()),
            other => panic!("expected custom payload, got {:?}", other),
        }
    }
}
