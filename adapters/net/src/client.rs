//! Guest side of the relay.

use futures_util::{SinkExt, StreamExt};
use root_racer_core::{
    protocol::{self, AnswerSubmission, ClientMessage, JoinRequest, ServerMessage},
    GameState, PlayerId,
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::NetError;

/// Something the host told a seated guest.
#[derive(Clone, Debug, PartialEq)]
pub enum RoomUpdate {
    /// Replacement copy of the room state.
    State(GameState),
    /// The host refused a request made by this guest.
    Rejected {
        /// Stable machine-readable reason.
        code: String,
        /// Human-readable explanation.
        message: String,
    },
}

/// Seat held by this process in a remote room.
#[derive(Debug)]
pub struct RemoteRoom {
    player_id: PlayerId,
    state: GameState,
    sender: RoomSender,
    updates: RoomUpdates,
}

impl RemoteRoom {
    /// Connects to a host and waits until it grants a seat.
    ///
    /// `addr` is a `host:port` pair as returned by
    /// [`invite::decode`](crate::invite::decode).
    pub async fn connect(addr: &str, request: JoinRequest) -> Result<Self, NetError> {
        let url = format!("ws://{addr}");
        let (socket, _response) = connect_async(url.as_str()).await?;
        let (mut write, mut read) = socket.split();

        write
            .send(Message::Text(protocol::encode(&ClientMessage::Join(
                request,
            ))?))
            .await?;

        let (player_id, state) = loop {
            let Some(frame) = read.next().await else {
                return Err(NetError::Closed);
            };
            let text = match frame? {
                Message::Text(text) => text,
                Message::Close(_) => return Err(NetError::Closed),
                _ => continue,
            };
            match protocol::decode::<ServerMessage>(&text)? {
                ServerMessage::Welcome {
                    game_state,
                    your_id,
                } => break (your_id, game_state),
                ServerMessage::Rejected { code, message } => {
                    return Err(NetError::Rejected { code, message });
                }
                ServerMessage::UpdateState(_) => {}
            }
        };
        info!(%addr, %player_id, room = %state.room_id, "joined room");

        let (outgoing_tx, mut outgoing) = mpsc::unbounded_channel::<ClientMessage>();
        let _ = tokio::spawn(async move {
            while let Some(message) = outgoing.recv().await {
                let text = match protocol::encode(&message) {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(%error, "dropping unencodable message");
                        continue;
                    }
                };
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        let (updates_tx, updates) = mpsc::unbounded_channel();
        let _ = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(error) => {
                        debug!(%error, "room socket failed");
                        break;
                    }
                };
                let update = match protocol::decode::<ServerMessage>(&text) {
                    Ok(ServerMessage::UpdateState(state)) => RoomUpdate::State(state),
                    Ok(ServerMessage::Welcome { game_state, .. }) => RoomUpdate::State(game_state),
                    Ok(ServerMessage::Rejected { code, message }) => {
                        RoomUpdate::Rejected { code, message }
                    }
                    Err(error) => {
                        warn!(%error, "ignoring malformed frame from host");
                        continue;
                    }
                };
                if updates_tx.send(update).is_err() {
                    break;
                }
            }
            debug!("room connection closed");
        });

        Ok(Self {
            player_id,
            state,
            sender: RoomSender { tx: outgoing_tx },
            updates: RoomUpdates { rx: updates },
        })
    }

    /// Seat the host assigned to this guest.
    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Room state delivered with the welcome.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Handle for sending requests to the host.
    #[must_use]
    pub fn sender(&self) -> RoomSender {
        self.sender.clone()
    }

    /// Splits the room into its seat, welcome state, sender and update stream.
    #[must_use]
    pub fn into_parts(self) -> (PlayerId, GameState, RoomSender, RoomUpdates) {
        (self.player_id, self.state, self.sender, self.updates)
    }

    /// Waits for the next message from the host.
    pub async fn next_update(&mut self) -> Option<RoomUpdate> {
        let update = self.updates.next().await?;
        if let RoomUpdate::State(state) = &update {
            self.state = state.clone();
        }
        Some(update)
    }
}

/// Cloneable handle that sends requests to the host.
#[derive(Clone, Debug)]
pub struct RoomSender {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl RoomSender {
    /// Reports the score earned for a round.
    pub fn submit_answer(&self, round: u32, score: u32) -> Result<(), NetError> {
        self.tx
            .send(ClientMessage::SubmitAnswer(AnswerSubmission { round, score }))
            .map_err(|_| NetError::Closed)
    }
}

/// Stream of messages from the host. Ends when the connection closes.
#[derive(Debug)]
pub struct RoomUpdates {
    rx: mpsc::UnboundedReceiver<RoomUpdate>,
}

impl RoomUpdates {
    /// Waits for the next message from the host.
    pub async fn next(&mut self) -> Option<RoomUpdate> {
        self.rx.recv().await
    }
}
