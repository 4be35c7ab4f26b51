//! Hosted and joined multiplayer sessions.

use anyhow::{Context, Result};
use root_racer_core::{GameState, MatchStatus, PlayerId, PlayerProfile, PlayerSeat, HOST_SEAT};
use root_racer_net::{invite, Host, HostConfig, NetError, RemoteRoom, RoomUpdate};
use root_racer_storage::ProfileStore;
use root_racer_system_rating::outcome_for;
use tracing::{debug, warn};

use crate::{
    play::{MatchView, Transition},
    terminal::{self, Input},
};

pub(crate) async fn host(
    store: &ProfileStore,
    profile: &PlayerProfile,
    config: HostConfig,
) -> Result<()> {
    let handle = Host::bind(config, PlayerSeat::from_profile(profile)).await?;
    println!(
        "Hosting on {}; guests connect to {}.",
        handle.local_addr(),
        handle.advertised_addr()
    );
    println!("Invite code: {}", handle.invite_code());
    println!("Press Enter to start once everyone has joined; type 'quit' to close the room.");

    let mut states = handle.state();
    let mut state = states.borrow_and_update().clone();
    let mut view = MatchView::new(HOST_SEAT);
    let _ = view.update(&state);
    let mut input = Input::stdin();

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    println!("The room stopped unexpectedly.");
                    break;
                }
                state = states.borrow_and_update().clone();
                if view.update(&state) == Some(Transition::MatchEnded) {
                    record(store, &state, HOST_SEAT)?;
                    println!("Press Enter to play again with the same room, or type 'quit'.");
                }
            }
            line = input.next_line() => {
                let Some(line) = line? else { break };
                if terminal::is_quit(&line) {
                    break;
                }
                match state.status {
                    MatchStatus::Lobby => match handle.start_match().await {
                        Ok(()) => debug!("match start requested"),
                        Err(NetError::StartRejected(reason)) => println!("Cannot start: {reason}."),
                        Err(error) => return Err(error.into()),
                    },
                    MatchStatus::Playing => {
                        if let Some(answer) = view.answer(&state, &line) {
                            match handle.submit_answer(answer.round, answer.score).await {
                                Ok(()) => {}
                                Err(NetError::AnswerRejected(reason)) => {
                                    println!("Answer not counted: {reason}.");
                                }
                                Err(error) => return Err(error.into()),
                            }
                        }
                    }
                    MatchStatus::Ended => handle.reset_lobby()?,
                    MatchStatus::Idle | MatchStatus::Countdown => {}
                }
            }
        }
    }

    handle.shutdown().await;
    println!("Room closed.");
    Ok(())
}

pub(crate) async fn join(store: &ProfileStore, profile: &PlayerProfile, code: &str) -> Result<()> {
    let addr = invite::decode(code).context("could not read the invite code")?;
    let room = match RemoteRoom::connect(&addr, PlayerSeat::from_profile(profile).into()).await {
        Ok(room) => room,
        Err(NetError::Rejected { message, .. }) => {
            println!("The host turned us away: {message}.");
            return Ok(());
        }
        Err(error) => {
            return Err(error).with_context(|| format!("could not reach the host at {addr}"));
        }
    };

    let (me, mut state, sender, mut updates) = room.into_parts();
    println!("Joined as {me}. Waiting for the host to start; type 'quit' to leave.");
    let mut view = MatchView::new(me);
    let _ = view.update(&state);
    let mut input = Input::stdin();

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(RoomUpdate::State(next)) => {
                    state = next;
                    if view.update(&state) == Some(Transition::MatchEnded) {
                        record(store, &state, me)?;
                        println!("Waiting for the host to start another match.");
                    }
                }
                Some(RoomUpdate::Rejected { code, message }) => {
                    warn!(%code, "host rejected a request");
                    println!("Host: {message}.");
                }
                None => {
                    println!("The host closed the room.");
                    break;
                }
            },
            line = input.next_line() => {
                let Some(line) = line? else { break };
                if terminal::is_quit(&line) {
                    break;
                }
                if state.status != MatchStatus::Playing {
                    println!("Nothing to answer yet.");
                    continue;
                }
                if let Some(answer) = view.answer(&state, &line) {
                    sender.submit_answer(answer.round, answer.score)?;
                }
            }
        }
    }
    Ok(())
}

fn record(store: &ProfileStore, state: &GameState, me: PlayerId) -> Result<()> {
    let Some(outcome) = outcome_for(state, me) else {
        return Ok(());
    };
    if let Some((profile, record)) = store.record_match(outcome)? {
        terminal::print_record(&profile, &record);
    }
    Ok(())
}
