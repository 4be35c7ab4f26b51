use std::io;

use root_racer_core::{protocol::ProtocolError, AnswerError, StartError};
use thiserror::Error;

use crate::invite::InviteError;

/// Errors raised by the room relay and its clients.
#[derive(Debug, Error)]
pub enum NetError {
    /// The listener could not be bound.
    #[error("could not listen on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket failure.
        #[source]
        source: io::Error,
    },
    /// A socket operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The WebSocket layer failed.
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// The invite code could not be understood.
    #[error(transparent)]
    Invite(#[from] InviteError),
    /// The host refused a request.
    #[error("host rejected the request ({code}): {message}")]
    Rejected {
        /// Stable machine-readable reason.
        code: String,
        /// Human-readable explanation.
        message: String,
    },
    /// The room refused to start a match.
    #[error("match could not start: {0}")]
    StartRejected(StartError),
    /// The room refused an answer.
    #[error("answer was not accepted: {0}")]
    AnswerRejected(AnswerError),
    /// The room or connection has shut down.
    #[error("room connection closed")]
    Closed,
}
