//! JSON messages exchanged between a room host and its guests.
//!
//! Every message is an object tagged as `{"type": "...", "payload": ...}`.
//! Guests only ever send [`ClientMessage`]; the host answers with
//! [`ServerMessage`], always carrying the complete room state.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{GameState, PlayerId, PlayerSeat};

/// Details a guest presents when asking for a seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Display name of the guest.
    pub username: String,
    /// Rating of the guest's profile.
    pub rating: u32,
    /// Completed matches of the guest's profile.
    pub matches_played: u32,
}

impl From<PlayerSeat> for JoinRequest {
    fn from(seat: PlayerSeat) -> Self {
        Self {
            username: seat.username,
            rating: seat.rating,
            matches_played: seat.matches_played,
        }
    }
}

impl From<JoinRequest> for PlayerSeat {
    fn from(request: JoinRequest) -> Self {
        Self {
            username: request.username,
            rating: request.rating,
            matches_played: request.matches_played,
        }
    }
}

/// Score a guest earned for a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    /// Zero-based round the answer belongs to.
    pub round: u32,
    /// Score computed by the guest.
    pub score: u32,
}

/// Messages sent from a guest to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Requests a seat in the room.
    Join(JoinRequest),
    /// Reports the score earned for a round.
    SubmitAnswer(AnswerSubmission),
}

/// Messages sent from the host to guests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Confirms a join and hands the guest its seat.
    Welcome {
        /// Room state at the moment the guest was seated.
        game_state: GameState,
        /// Seat assigned to the guest.
        your_id: PlayerId,
    },
    /// Replaces the guest's copy of the room state.
    UpdateState(GameState),
    /// Reports that the host refused a request.
    Rejected {
        /// Stable machine-readable reason.
        code: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be represented as JSON.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encodes a message as a JSON text frame.
pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes a message from a JSON text frame.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_type_and_payload_tags() {
        let message = ClientMessage::SubmitAnswer(AnswerSubmission {
            round: 2,
            score: 870,
        });
        let encoded = encode(&message).expect("encode");
        assert_eq!(
            encoded,
            r#"{"type":"SUBMIT_ANSWER","payload":{"round":2,"score":870}}"#
        );
    }

    #[test]
    fn join_decodes_from_wire_text() {
        let text = r#"{"type":"JOIN","payload":{"username":"ada","rating":1000,"matches_played":3}}"#;
        let decoded: ClientMessage = decode(text).expect("decode");
        assert_eq!(
            decoded,
            ClientMessage::Join(JoinRequest {
                username: "ada".to_owned(),
                rating: 1000,
                matches_played: 3,
            })
        );
    }

    #[test]
    fn unknown_message_type_is_malformed() {
        let result = decode::<ClientMessage>(r#"{"type":"RESET_EVERYTHING"}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }
}
