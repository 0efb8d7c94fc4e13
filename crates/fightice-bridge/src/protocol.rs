//! Wire protocol between the supervisor and the game process
//!
//! Messages are JSON with an internal `type` tag, length-prefixed on the
//! wire (see [`crate::transport`]). Two channels exist: the gateway channel
//! (supervisor → game, request/response) and the callback channel
//! (game → supervisor's callback listener).

use fightice_core::{ActionId, FrameState};
use serde::{Deserialize, Serialize};

/// Requests sent to the game's gateway port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayRequest {
    /// Point the game's callback client at our listener port.
    ///
    /// Mandatory first request: without it the game keeps its default
    /// callback target and can never reach registered handlers.
    RedirectCallback { port: u16 },

    /// Announce a local AI under a stable name
    RegisterAi { name: String },

    /// Configure one match
    CreateGame {
        character1: String,
        character2: String,
        player1: String,
        player2: String,
        rounds_per_match: u32,
    },

    /// Run a created match to completion; the response arrives at match end
    RunGame { game_id: u64 },
}

/// Responses from the game's gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayResponse {
    Ok,
    GameCreated { game_id: u64 },
    GameFinished,
    Error { message: String },
}

/// Callbacks the game pushes to the listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackRequest {
    /// One simulated frame for the named AI; expects an action in reply
    Frame { ai: String, state: FrameState },
    /// A round just finished for the named AI
    RoundEnd { ai: String, state: FrameState },
}

/// Replies to callback requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackReply {
    Action { action: ActionId },
    Ok,
    Error { message: String },
}

/// Serialize a protocol message to JSON bytes
pub fn serialize<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(msg)
}

/// Deserialize a protocol message from JSON bytes
pub fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_game_round_trip() {
        let msg = GatewayRequest::CreateGame {
            character1: "ZEN".into(),
            character2: "ZEN".into(),
            player1: "EnvObserver".into(),
            player2: "MctsAi".into(),
            rounds_per_match: 3,
        };
        let bytes = serialize(&msg).unwrap();
        match deserialize(&bytes).unwrap() {
            GatewayRequest::CreateGame {
                player2,
                rounds_per_match,
                ..
            } => {
                assert_eq!(player2, "MctsAi");
                assert_eq!(rounds_per_match, 3);
            }
            other => panic!("wrong message: {:?}", other),
        }
    }

    #[test]
    fn redirect_callback_wire_shape() {
        let bytes = serialize(&GatewayRequest::RedirectCallback { port: 51234 }).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"redirect_callback","port":51234}"#
        );
    }

    #[test]
    fn action_reply_wire_shape() {
        let reply = CallbackReply::Action {
            action: ActionId::new(38).unwrap(),
        };
        let bytes = serialize(&reply).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"action","action":38}"#
        );
    }

    #[test]
    fn frame_request_from_game() {
        // Exact JSON shape the game side produces
        let json = r#"{"type":"frame","ai":"EnvObserver","state":{"frame_data":[0.5,0.25],"reward":10.0,"round_over":false,"match_over":false}}"#;
        match serde_json::from_str(json).unwrap() {
            CallbackRequest::Frame { ai, state } => {
                assert_eq!(ai, "EnvObserver");
                assert_eq!(state.reward, 10.0);
                assert!(!state.round_over);
            }
            other => panic!("wrong message: {:?}", other),
        }
    }

    #[test]
    fn frame_request_defaults_optional_fields() {
        let json = r#"{"type":"frame","ai":"EnvObserver","state":{}}"#;
        match serde_json::from_str(json).unwrap() {
            CallbackRequest::Frame { state, .. } => {
                assert_eq!(state.reward, 0.0);
                assert!(state.frame_data.is_null());
            }
            other => panic!("wrong message: {:?}", other),
        }
    }
}
