use std::{net::SocketAddr, time::Duration};

use futures_util::{SinkExt, StreamExt};
use root_racer_core::{
    protocol::{self, JoinRequest, ServerMessage},
    AnswerError, GameState, MatchConfig, MatchMode, MatchStatus, PlayerId, PlayerSeat,
    StartError, HOST_SEAT,
};
use root_racer_net::{invite, Host, HostConfig, HostHandle, NetError, RemoteRoom, RoomUpdate};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const PATIENCE: Duration = Duration::from_secs(5);

fn config(rounds: u32, round_secs: u64) -> HostConfig {
    HostConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        advertise: None,
        match_config: MatchConfig::new(rounds, Duration::from_secs(round_secs), Duration::ZERO),
        seed: Some(7),
    }
}

async fn host_with(config: HostConfig) -> HostHandle {
    Host::bind(config, PlayerSeat::new("host", 1200, 6))
        .await
        .expect("host binds")
}

async fn host(rounds: u32, round_secs: u64) -> HostHandle {
    host_with(config(rounds, round_secs)).await
}

fn request(name: &str) -> JoinRequest {
    JoinRequest {
        username: name.to_owned(),
        rating: 1000,
        matches_played: 0,
    }
}

async fn join(handle: &HostHandle, name: &str) -> RemoteRoom {
    RemoteRoom::connect(&handle.local_addr().to_string(), request(name))
        .await
        .expect("guest joins")
}

async fn state_where(room: &mut RemoteRoom, accept: impl Fn(&GameState) -> bool) -> GameState {
    timeout(PATIENCE, async {
        loop {
            match room.next_update().await.expect("room open") {
                RoomUpdate::State(state) if accept(&state) => return state,
                RoomUpdate::State(_) => {}
                RoomUpdate::Rejected { code, message } => panic!("unexpected {code}: {message}"),
            }
        }
    })
    .await
    .expect("state arrives in time")
}

async fn host_state_where(handle: &HostHandle, accept: impl FnMut(&GameState) -> bool) -> GameState {
    let mut state = handle.state();
    let current = timeout(PATIENCE, state.wait_for(accept))
        .await
        .expect("host state arrives in time")
        .expect("room open")
        .clone();
    current
}

#[tokio::test]
async fn guest_is_welcomed_with_its_seat() {
    let handle = host(5, 20).await;
    let room = join(&handle, "ada").await;

    assert_eq!(room.player_id(), PlayerId::new(2));
    let state = room.state();
    assert_eq!(state.status, MatchStatus::Lobby);
    assert_eq!(state.mode, MatchMode::Multiplayer);
    assert_eq!(state.host_id, HOST_SEAT);
    assert_eq!(state.players.len(), 2);
    assert_eq!(state.room_id, handle.invite_code());
    assert_eq!(
        invite::decode(handle.invite_code()).unwrap(),
        handle.local_addr().to_string()
    );

    let seen = host_state_where(&handle, |state| state.players.len() == 2).await;
    assert_eq!(seen.players[1].username, "ada");
    assert!(!seen.players[1].ready);

    handle.shutdown().await;
}

#[tokio::test]
async fn seated_guests_hear_about_later_joiners() {
    let handle = host(5, 20).await;
    let mut first = join(&handle, "ada").await;
    let second = join(&handle, "grace").await;
    assert_eq!(second.player_id(), PlayerId::new(3));

    let state = state_where(&mut first, |state| state.players.len() == 3).await;
    assert_eq!(state.players[2].username, "grace");

    handle.shutdown().await;
}

#[tokio::test]
async fn answers_are_credited_to_the_sending_seat() {
    let handle = host(3, 20).await;
    let mut ada = join(&handle, "ada").await;
    let mut grace = join(&handle, "grace").await;
    let _ = host_state_where(&handle, |state| state.players.len() == 3).await;

    handle.start_match().await.expect("match starts");
    let playing = state_where(&mut ada, |state| state.status == MatchStatus::Playing).await;
    assert_eq!(playing.problems.len(), 3);
    assert_eq!(playing.current_round, 0);

    ada.sender().submit_answer(0, 900).expect("send");
    let state = state_where(&mut grace, |state| {
        state.player(PlayerId::new(2)).is_some_and(|p| p.score == 900)
    })
    .await;
    assert_eq!(state.player(PlayerId::new(3)).unwrap().score, 0);
    assert_eq!(state.player(HOST_SEAT).unwrap().score, 0);

    handle.submit_answer(0, 500).await.expect("host answer");
    let again = handle.submit_answer(0, 500).await;
    assert!(matches!(
        again,
        Err(NetError::AnswerRejected(AnswerError::AlreadyAnswered))
    ));

    handle.shutdown().await;
}

#[tokio::test]
async fn duplicate_guest_answers_are_rejected() {
    let handle = host(3, 20).await;
    let mut ada = join(&handle, "ada").await;
    handle.start_match().await.expect("match starts");
    let _ = state_where(&mut ada, |state| state.status == MatchStatus::Playing).await;

    let sender = ada.sender();
    sender.submit_answer(0, 700).expect("send");
    sender.submit_answer(0, 700).expect("send");

    let rejection = timeout(PATIENCE, async {
        loop {
            if let RoomUpdate::Rejected { code, .. } = ada.next_update().await.expect("open") {
                return code;
            }
        }
    })
    .await
    .expect("rejection arrives");
    assert_eq!(rejection, "ALREADY_ANSWERED");
    assert_eq!(ada.state().player(PlayerId::new(2)).unwrap().score, 700);

    handle.shutdown().await;
}

#[tokio::test]
async fn joining_a_running_match_is_rejected() {
    let handle = host(3, 20).await;
    handle.start_match().await.expect("host may play alone");

    let result = RemoteRoom::connect(&handle.local_addr().to_string(), request("late")).await;
    match result {
        Err(NetError::Rejected { code, .. }) => assert_eq!(code, "MATCH_IN_PROGRESS"),
        other => panic!("expected rejection, got {other:?}"),
    }

    let again = handle.start_match().await;
    assert!(matches!(
        again,
        Err(NetError::StartRejected(StartError::InvalidStatus))
    ));

    handle.shutdown().await;
}

#[tokio::test]
async fn malformed_and_unseated_frames_are_rejected() {
    let handle = host(3, 20).await;
    let url = format!("ws://{}", handle.local_addr());
    let (mut socket, _) = connect_async(url.as_str()).await.expect("connect");

    async fn next_rejection(socket: &mut WsStream) -> String {
        loop {
            let frame = timeout(PATIENCE, socket.next())
                .await
                .expect("reply in time")
                .expect("socket open")
                .expect("frame");
            if let Message::Text(text) = frame {
                if let ServerMessage::Rejected { code, .. } = protocol::decode(&text).unwrap() {
                    return code;
                }
            }
        }
    }

    socket
        .send(Message::Text("hello there".to_owned()))
        .await
        .unwrap();
    assert_eq!(next_rejection(&mut socket).await, "MALFORMED");

    socket
        .send(Message::Text(
            r#"{"type":"SUBMIT_ANSWER","payload":{"round":0,"score":1200}}"#.to_owned(),
        ))
        .await
        .unwrap();
    assert_eq!(next_rejection(&mut socket).await, "NOT_SEATED");

    handle.shutdown().await;
}

#[tokio::test]
async fn round_timer_ends_match_and_lobby_can_reset() {
    let handle = host(1, 1).await;
    let mut ada = join(&handle, "ada").await;
    handle.start_match().await.expect("match starts");

    let ended = state_where(&mut ada, |state| state.status == MatchStatus::Ended).await;
    assert_eq!(ended.time_remaining_secs, 0);
    assert!(ended.players.iter().all(|player| player.score == 0));
    let _ = host_state_where(&handle, |state| state.status == MatchStatus::Ended).await;

    handle.reset_lobby().expect("room open");
    let lobby = state_where(&mut ada, |state| state.status == MatchStatus::Lobby).await;
    assert!(lobby.problems.is_empty());
    assert_eq!(lobby.players.len(), 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_guest_connections() {
    let handle = host(3, 20).await;
    let mut ada = join(&handle, "ada").await;
    handle.shutdown().await;

    timeout(PATIENCE, async { while ada.next_update().await.is_some() {} })
        .await
        .expect("connection closes");
}

#[tokio::test]
async fn wildcard_bind_advertises_a_dialable_address() {
    let handle = host_with(HostConfig {
        bind: "0.0.0.0:0".parse().unwrap(),
        ..config(3, 20)
    })
    .await;

    let decoded: SocketAddr = invite::decode(handle.invite_code())
        .unwrap()
        .parse()
        .expect("invite names a socket address");
    assert!(!decoded.ip().is_unspecified());
    assert_eq!(decoded.port(), handle.local_addr().port());
    assert_eq!(decoded, handle.advertised_addr());

    handle.shutdown().await;
}

#[tokio::test]
async fn explicit_advertise_address_goes_into_the_invite() {
    let handle = host_with(HostConfig {
        advertise: Some("10.1.2.3:9000".parse().unwrap()),
        ..config(3, 20)
    })
    .await;

    assert_eq!(invite::decode(handle.invite_code()).unwrap(), "10.1.2.3:9000");
    assert_eq!(handle.state().borrow().room_id, handle.invite_code());

    handle.shutdown().await;
}

#[tokio::test]
async fn advertised_port_zero_uses_the_bound_port() {
    let handle = host_with(HostConfig {
        advertise: Some("10.1.2.3:0".parse().unwrap()),
        ..config(3, 20)
    })
    .await;

    let expected = format!("10.1.2.3:{}", handle.local_addr().port());
    assert_eq!(invite::decode(handle.invite_code()).unwrap(), expected);

    handle.shutdown().await;
}

#[tokio::test]
async fn disconnected_guest_keeps_a_stale_seat() {
    let handle = host(1, 1).await;
    let mut ada = join(&handle, "ada").await;
    let grace = join(&handle, "grace").await;
    let _ = host_state_where(&handle, |state| state.players.len() == 3).await;

    drop(grace);
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.start_match().await.expect("match starts without grace");

    let playing = state_where(&mut ada, |state| state.status == MatchStatus::Playing).await;
    assert_eq!(playing.players.len(), 3);
    assert_eq!(playing.players[2].username, "grace");

    let ended = state_where(&mut ada, |state| state.status == MatchStatus::Ended).await;
    assert_eq!(ended.players.len(), 3);
    assert_eq!(ended.player(PlayerId::new(3)).unwrap().score, 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn dropping_the_handle_closes_the_room() {
    let handle = host(3, 20).await;
    let addr = handle.local_addr().to_string();
    let mut ada = join(&handle, "ada").await;
    drop(handle);

    timeout(PATIENCE, async { while ada.next_update().await.is_some() {} })
        .await
        .expect("connection closes");
    let late = timeout(PATIENCE, RemoteRoom::connect(&addr, request("late")))
        .await
        .expect("connect settles in time");
    assert!(late.is_err());
}
