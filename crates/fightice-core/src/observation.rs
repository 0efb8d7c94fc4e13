//! Observation and step-outcome types

use serde::{Deserialize, Serialize};

/// Agent observation (encoding is collaborator-defined)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    /// Flat feature vector (data-mode variants)
    Vector(Vec<f64>),
    /// Game-defined payload (display/image variants)
    Custom(serde_json::Value),
}

impl Observation {
    /// Placeholder observation used in degraded outcomes.
    pub fn empty() -> Self {
        Observation::Vector(Vec::new())
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Observation::Vector(v) => Some(v),
            Observation::Custom(_) => None,
        }
    }
}

/// Three-state episode signal.
///
/// The crashed case is deliberately distinct from termination: it means the
/// tuple carries no game result at all and the caller should reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Round still in progress
    Continuing,
    /// Round finished normally
    Terminated,
    /// The game process died since the last call
    SessionCrashed,
}

impl StepStatus {
    /// True when the caller must call `reset` before stepping again.
    pub fn needs_reset(self) -> bool {
        !matches!(self, StepStatus::Continuing)
    }
}

/// Auxiliary step information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Set on the first step after a crash was detected
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pre_game_crashed: bool,
}

impl StepInfo {
    pub fn is_empty(&self) -> bool {
        !self.pre_game_crashed
    }
}

/// The 4-tuple returned by `step`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub status: StepStatus,
    pub info: StepInfo,
}

impl StepOutcome {
    /// Degraded outcome surfaced on the step after a crash: zero reward, no
    /// usable observation, and the pre-crash flag set.
    pub fn crashed() -> Self {
        Self {
            observation: Observation::empty(),
            reward: 0.0,
            status: StepStatus::SessionCrashed,
            info: StepInfo {
                pre_game_crashed: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crashed_outcome_shape() {
        let outcome = StepOutcome::crashed();
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(outcome.status, StepStatus::SessionCrashed);
        assert!(outcome.info.pre_game_crashed);
        assert_eq!(outcome.observation.as_vector(), Some(&[][..]));
    }

    #[test]
    fn status_reset_requirement() {
        assert!(!StepStatus::Continuing.needs_reset());
        assert!(StepStatus::Terminated.needs_reset());
        assert!(StepStatus::SessionCrashed.needs_reset());
    }

    #[test]
    fn info_serializes_empty_when_clean() {
        let info = StepInfo::default();
        assert_eq!(serde_json::to_string(&info).unwrap(), "{}");

        let crashed = StepInfo {
            pre_game_crashed: true,
        };
        assert_eq!(
            serde_json::to_string(&crashed).unwrap(),
            r#"{"pre_game_crashed":true}"#
        );
    }

    #[test]
    fn observation_vector_round_trip() {
        let obs = Observation::Vector(vec![0.5, 1.0]);
        let json = serde_json::to_string(&obs).unwrap();
        assert_eq!(json, "[0.5,1.0]");
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
    }
}
