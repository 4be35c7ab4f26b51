//! Host side of the relay.
//!
//! A single room task owns the [`World`]. Sockets never touch it directly;
//! they forward what they read into the room's inbox and drain an outbox the
//! room fills. The hosting player talks to the same inbox through
//! [`HostHandle`].

use std::{
    collections::HashMap,
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use root_racer_core::{
    protocol::{self, ClientMessage, ServerMessage},
    AnswerError, Command, Event, GameState, JoinError, MatchConfig, PlayerId, PlayerSeat,
    StartError, HOST_SEAT,
};
use root_racer_system_problems::ProblemGenerator;
use root_racer_world::{self as world, query, World};
use tokio::{
    net::{TcpListener, TcpStream, UdpSocket},
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{invite, NetError};

const TICK: Duration = Duration::from_secs(1);
const MALFORMED: &str = "MALFORMED";
const NOT_SEATED: &str = "NOT_SEATED";
// Never contacted; connecting a UDP socket only selects the outbound route.
const ROUTE_TARGET_V4: &str = "192.0.2.1:9";
const ROUTE_TARGET_V6: &str = "[2001:db8::1]:9";

/// Settings used when opening a hosted room.
#[derive(Clone, Copy, Debug)]
pub struct HostConfig {
    /// Address the WebSocket listener binds to.
    pub bind: SocketAddr,
    /// Address written into the invite code. When absent, a wildcard bind
    /// advertises the machine's outbound interface and any other bind
    /// advertises itself. A port of `0` is replaced by the bound port.
    pub advertise: Option<SocketAddr>,
    /// Rounds, round length and countdown used for every match.
    pub match_config: MatchConfig,
    /// Seed for problem generation; entropy is used when absent.
    pub seed: Option<u64>,
}

/// Entry point for hosting a room.
#[derive(Debug)]
pub struct Host;

impl Host {
    /// Binds the listener, opens the lobby and starts the room task.
    pub async fn bind(config: HostConfig, host: PlayerSeat) -> Result<HostHandle, NetError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| NetError::Bind {
                addr: config.bind.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        let advertised_addr = advertised_addr(config.advertise, local_addr).await;
        let invite_code = invite::encode(advertised_addr);

        let mut world = World::with_config(config.match_config);
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::OpenLobby {
                room_id: invite_code.clone(),
                host,
            },
            &mut events,
        );
        let (state_tx, state_rx) = watch::channel(query::snapshot(&world));

        let generator = match config.seed {
            Some(seed) => ProblemGenerator::new(seed),
            None => ProblemGenerator::from_entropy(),
        };
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let room = Room {
            world,
            generator,
            connections: HashMap::new(),
            next_seat: HOST_SEAT.get() + 1,
            state_tx,
        };
        let room_task = tokio::spawn(room.run(inbox_rx));
        let accept_task = tokio::spawn(accept_loop(listener, inbox_tx.clone()));
        info!(%local_addr, %advertised_addr, code = %invite_code, "hosting room");

        Ok(HostHandle {
            local_addr,
            advertised_addr,
            invite_code,
            inbox: inbox_tx,
            state: state_rx,
            room_task,
            accept_task,
        })
    }
}

/// Resolves the address guests are told to dial.
async fn advertised_addr(advertise: Option<SocketAddr>, local_addr: SocketAddr) -> SocketAddr {
    if let Some(mut addr) = advertise {
        if addr.port() == 0 {
            addr.set_port(local_addr.port());
        }
        return addr;
    }
    if !local_addr.ip().is_unspecified() {
        return local_addr;
    }
    let ip = match outbound_ip(local_addr.is_ipv4()).await {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => loopback(local_addr.is_ipv4()),
        Err(error) => {
            debug!(%error, "no outbound route; advertising loopback");
            loopback(local_addr.is_ipv4())
        }
    };
    SocketAddr::new(ip, local_addr.port())
}

async fn outbound_ip(ipv4: bool) -> io::Result<IpAddr> {
    let (bind, target) = if ipv4 {
        ("0.0.0.0:0", ROUTE_TARGET_V4)
    } else {
        ("[::]:0", ROUTE_TARGET_V6)
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(target).await?;
    Ok(socket.local_addr()?.ip())
}

fn loopback(ipv4: bool) -> IpAddr {
    if ipv4 {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        IpAddr::V6(Ipv6Addr::LOCALHOST)
    }
}

/// Controls a hosted room on behalf of the hosting player.
///
/// Dropping the handle without calling [`HostHandle::shutdown`] still stops
/// accepting guests and closes the room.
#[derive(Debug)]
pub struct HostHandle {
    local_addr: SocketAddr,
    advertised_addr: SocketAddr,
    invite_code: String,
    inbox: mpsc::UnboundedSender<RoomInput>,
    state: watch::Receiver<GameState>,
    room_task: JoinHandle<()>,
    accept_task: JoinHandle<()>,
}

impl HostHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address encoded in the invite code.
    #[must_use]
    pub fn advertised_addr(&self) -> SocketAddr {
        self.advertised_addr
    }

    /// Invite code guests use to join.
    #[must_use]
    pub fn invite_code(&self) -> &str {
        &self.invite_code
    }

    /// Receiver that observes every change to the room state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<GameState> {
        self.state.clone()
    }

    /// Starts a match from the lobby with a freshly generated problem set.
    pub async fn start_match(&self) -> Result<(), NetError> {
        let (reply, response) = oneshot::channel();
        self.send(HostRequest::StartMatch { reply })?;
        response
            .await
            .map_err(|_| NetError::Closed)?
            .map_err(NetError::StartRejected)
    }

    /// Credits the hosting player with a round score.
    pub async fn submit_answer(&self, round: u32, score: u32) -> Result<(), NetError> {
        let (reply, response) = oneshot::channel();
        self.send(HostRequest::SubmitAnswer {
            round,
            score,
            reply,
        })?;
        response
            .await
            .map_err(|_| NetError::Closed)?
            .map_err(NetError::AnswerRejected)
    }

    /// Returns a finished room to its lobby so the same players can go again.
    pub fn reset_lobby(&self) -> Result<(), NetError> {
        self.send(HostRequest::ResetLobby)
    }

    /// Closes every connection and stops the room.
    pub async fn shutdown(mut self) {
        self.accept_task.abort();
        if self.send(HostRequest::Shutdown).is_ok() {
            let _ = (&mut self.room_task).await;
        }
        info!(local_addr = %self.local_addr, "room closed");
    }

    fn send(&self, request: HostRequest) -> Result<(), NetError> {
        self.inbox
            .send(RoomInput::Host(request))
            .map_err(|_| NetError::Closed)
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.accept_task.abort();
        let _ = self.inbox.send(RoomInput::Host(HostRequest::Shutdown));
    }
}

type ConnectionId = u64;

#[derive(Debug)]
enum RoomInput {
    Connected {
        id: ConnectionId,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    },
    Received {
        id: ConnectionId,
        message: ClientMessage,
    },
    Malformed {
        id: ConnectionId,
        reason: String,
    },
    Disconnected {
        id: ConnectionId,
    },
    Host(HostRequest),
}

#[derive(Debug)]
enum HostRequest {
    StartMatch {
        reply: oneshot::Sender<Result<(), StartError>>,
    },
    SubmitAnswer {
        round: u32,
        score: u32,
        reply: oneshot::Sender<Result<(), AnswerError>>,
    },
    ResetLobby,
    Shutdown,
}

#[derive(Debug)]
struct Connection {
    outbox: mpsc::UnboundedSender<ServerMessage>,
    seat: Option<PlayerId>,
}

struct Room {
    world: World,
    generator: ProblemGenerator,
    connections: HashMap<ConnectionId, Connection>,
    next_seat: u32,
    state_tx: watch::Sender<GameState>,
}

impl Room {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<RoomInput>) {
        let mut ticker = time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                input = inbox.recv() => {
                    let Some(input) = input else { break };
                    match input {
                        RoomInput::Host(HostRequest::Shutdown) => break,
                        RoomInput::Host(HostRequest::StartMatch { reply }) => {
                            let result = self.start_match();
                            if result.is_ok() {
                                ticker.reset();
                            }
                            let _ = reply.send(result);
                        }
                        other => self.handle(other),
                    }
                }
                _ = ticker.tick() => self.tick(),
            }
        }

        debug!(connections = self.connections.len(), "closing guest connections");
        self.connections.clear();
    }

    fn handle(&mut self, input: RoomInput) {
        match input {
            RoomInput::Connected { id, outbox } => {
                debug!(connection = id, "guest connected");
                let _ = self
                    .connections
                    .insert(id, Connection { outbox, seat: None });
            }
            RoomInput::Received { id, message } => self.receive(id, message),
            RoomInput::Malformed { id, reason } => self.reject(id, MALFORMED, &reason),
            RoomInput::Disconnected { id } => {
                if let Some(connection) = self.connections.remove(&id) {
                    info!(connection = id, seat = ?connection.seat, "guest disconnected");
                }
            }
            RoomInput::Host(HostRequest::SubmitAnswer {
                round,
                score,
                reply,
            }) => {
                let result = self.submit(HOST_SEAT, round, score);
                let _ = reply.send(result);
            }
            RoomInput::Host(HostRequest::ResetLobby) => {
                let events = self.apply(Command::ResetLobby);
                if !events.contains(&Event::LobbyReset) {
                    warn!("reset ignored; the match has not finished");
                }
            }
            RoomInput::Host(HostRequest::StartMatch { .. } | HostRequest::Shutdown) => {}
        }
    }

    fn receive(&mut self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Join(request) => self.join(id, request.into()),
            ClientMessage::SubmitAnswer(submission) => {
                let Some(seat) = self.connections.get(&id).and_then(|c| c.seat) else {
                    self.reject(id, NOT_SEATED, "join the room before answering");
                    return;
                };
                if let Err(reason) = self.submit(seat, submission.round, submission.score) {
                    self.reject(id, reason.code(), &reason.to_string());
                }
            }
        }
    }

    fn join(&mut self, id: ConnectionId, seat: PlayerSeat) {
        if self
            .connections
            .get(&id)
            .is_some_and(|connection| connection.seat.is_some())
        {
            let reason = JoinError::AlreadySeated;
            self.reject(id, reason.code(), &reason.to_string());
            return;
        }

        let player_id = PlayerId::new(self.next_seat);
        let username = seat.username.clone();
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Join { player_id, seat }, &mut events);

        for event in &events {
            if let Event::JoinRejected { reason, .. } = event {
                debug!(connection = id, %reason, "join rejected");
                self.reject(id, reason.code(), &reason.to_string());
                return;
            }
        }

        self.next_seat += 1;
        let state = self.publish(&events, Some(id));
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.seat = Some(player_id);
            let _ = connection.outbox.send(ServerMessage::Welcome {
                game_state: state,
                your_id: player_id,
            });
        }
        info!(connection = id, %player_id, %username, "guest seated");
    }

    fn start_match(&mut self) -> Result<(), StartError> {
        let rounds = query::config(&self.world).rounds();
        let problems = self.generator.generate_set(rounds);
        let events = self.apply(Command::StartMatch { problems });
        for event in &events {
            if let Event::StartRejected { reason } = event {
                return Err(*reason);
            }
        }
        info!(rounds, players = query::players(&self.world).len(), "match started");
        Ok(())
    }

    fn submit(&mut self, player_id: PlayerId, round: u32, score: u32) -> Result<(), AnswerError> {
        let events = self.apply(Command::SubmitAnswer {
            player_id,
            round,
            score,
        });
        for event in &events {
            if let Event::AnswerRejected { reason, .. } = event {
                debug!(%player_id, round, %reason, "answer rejected");
                return Err(*reason);
            }
        }
        Ok(())
    }

    fn tick(&mut self) {
        let events = self.apply(Command::Tick { dt: TICK });
        for event in &events {
            if let Event::MatchEnded { standings } = event {
                info!(?standings, "match ended");
            }
        }
    }

    fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        let _ = self.publish(&events, None);
        events
    }

    /// Refreshes the host's view and, when state changed, every guest's copy.
    ///
    /// `skip` names a connection that receives the state some other way.
    fn publish(&mut self, events: &[Event], skip: Option<ConnectionId>) -> GameState {
        let state = query::snapshot(&self.world);
        let _ = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });

        if events.iter().any(Event::changes_state) {
            for (id, connection) in &self.connections {
                if Some(*id) == skip || connection.seat.is_none() {
                    continue;
                }
                let _ = connection
                    .outbox
                    .send(ServerMessage::UpdateState(state.clone()));
            }
        }
        state
    }

    fn reject(&self, id: ConnectionId, code: &str, message: &str) {
        if let Some(connection) = self.connections.get(&id) {
            let _ = connection.outbox.send(ServerMessage::Rejected {
                code: code.to_owned(),
                message: message.to_owned(),
            });
        }
    }
}

async fn accept_loop(listener: TcpListener, inbox: mpsc::UnboundedSender<RoomInput>) {
    let mut next_id: ConnectionId = 0;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                next_id += 1;
                debug!(%peer, connection = next_id, "accepted socket");
                let _ = tokio::spawn(serve_connection(stream, next_id, inbox.clone()));
            }
            Err(error) => warn!(%error, "failed to accept connection"),
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    id: ConnectionId,
    inbox: mpsc::UnboundedSender<RoomInput>,
) {
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(error) => {
            warn!(connection = id, %error, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = socket.split();
    let (outbox, mut outgoing) = mpsc::unbounded_channel::<ServerMessage>();
    // The room holds the only sender; dropping it closes the socket.
    if inbox.send(RoomInput::Connected { id, outbox }).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let text = match protocol::encode(&message) {
                Ok(text) => text,
                Err(error) => {
                    warn!(connection = id, %error, "dropping unencodable message");
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.send(Message::Close(None)).await;
    });

    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                let reason = "binary frames are not supported".to_owned();
                if inbox.send(RoomInput::Malformed { id, reason }).is_err() {
                    break;
                }
                continue;
            }
            Ok(_) => continue,
            Err(error) => {
                debug!(connection = id, %error, "socket read failed");
                break;
            }
        };
        match protocol::decode::<ClientMessage>(&text) {
            Ok(message) => {
                if inbox.send(RoomInput::Received { id, message }).is_err() {
                    break;
                }
            }
            Err(error) => {
                warn!(connection = id, %error, "malformed frame");
                let reason = error.to_string();
                if inbox.send(RoomInput::Malformed { id, reason }).is_err() {
                    break;
                }
            }
        }
    }

    let _ = inbox.send(RoomInput::Disconnected { id });
    let _ = writer.await;
}
