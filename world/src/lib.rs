#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative room state management for Root Racer.
//!
//! A [`World`] holds exactly one room. In multiplayer the host's world is the
//! ground truth that every guest mirrors; in solo it simply runs the local
//! match. All mutations go through [`apply`].

use std::{collections::BTreeSet, time::Duration};

use root_racer_core::{
    normalize_username, rank_players, AnswerError, Command, Event, JoinError, MatchConfig,
    MatchMode, MatchStatus, PlayerId, PlayerSeat, PlayerState, Problem, StartError, HOST_SEAT,
    LOCAL_ROOM, WELCOME_BANNER,
};

const FALLBACK_HOST_NAME: &str = "Host";

/// Represents the authoritative Root Racer room state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: MatchConfig,
    status: MatchStatus,
    mode: MatchMode,
    room_id: String,
    host_id: PlayerId,
    participants: Vec<Participant>,
    problems: Vec<Problem>,
    current_round: u32,
    remaining: Duration,
    answered: BTreeSet<PlayerId>,
}

impl World {
    /// Creates an idle world using the default match configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MatchConfig::default())
    }

    /// Creates an idle world using the provided match configuration.
    #[must_use]
    pub fn with_config(config: MatchConfig) -> Self {
        Self {
            banner: WELCOME_BANNER,
            config,
            status: MatchStatus::Idle,
            mode: MatchMode::Solo,
            room_id: String::new(),
            host_id: HOST_SEAT,
            participants: Vec::new(),
            problems: Vec::new(),
            current_round: 0,
            remaining: config.round_time(),
            answered: BTreeSet::new(),
        }
    }

    fn participant_mut(&mut self, player_id: PlayerId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|participant| participant.id == player_id)
    }

    fn seat_room(&mut self, mode: MatchMode, room_id: String, host: PlayerSeat) {
        let username =
            normalize_username(&host.username).unwrap_or_else(|| FALLBACK_HOST_NAME.to_owned());
        self.mode = mode;
        self.room_id = room_id;
        self.host_id = HOST_SEAT;
        self.participants = vec![Participant::seated(HOST_SEAT, username, &host, true)];
        self.problems.clear();
        self.current_round = 0;
        self.remaining = self.config.round_time();
        self.answered.clear();
    }

    fn rounds(&self) -> u32 {
        u32::try_from(self.problems.len()).unwrap_or(u32::MAX)
    }

    fn clear_scores(&mut self) {
        for participant in &mut self.participants {
            participant.score = 0;
            participant.finished = false;
        }
    }

    fn begin_playing(&mut self, out_events: &mut Vec<Event>) {
        self.status = MatchStatus::Playing;
        self.current_round = 0;
        self.remaining = self.config.round_time();
        self.answered.clear();
        out_events.push(Event::MatchStarted {
            mode: self.mode,
            rounds: self.rounds(),
        });
        out_events.push(Event::RoundStarted { round: 0 });
    }

    fn advance_round(&mut self, out_events: &mut Vec<Event>) {
        let next = self.current_round.saturating_add(1);
        if next >= self.rounds() {
            self.end_match(out_events);
            return;
        }

        self.current_round = next;
        self.remaining = self.config.round_time();
        self.answered.clear();
        out_events.push(Event::RoundStarted { round: next });
    }

    fn end_match(&mut self, out_events: &mut Vec<Event>) {
        self.status = MatchStatus::Ended;
        self.remaining = Duration::ZERO;
        self.answered.clear();
        let standings = rank_players(&query::players(self));
        out_events.push(Event::MatchEnded { standings });
    }

    fn run_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let mut left = dt;
        if self.status == MatchStatus::Countdown {
            if left < self.remaining {
                self.remaining -= left;
                return;
            }
            left -= self.remaining;
            self.begin_playing(out_events);
        }

        while self.status == MatchStatus::Playing {
            if left < self.remaining {
                self.remaining -= left;
                break;
            }
            left -= self.remaining;
            self.advance_round(out_events);
        }
    }

    fn submit_answer(&mut self, player_id: PlayerId, round: u32, score: u32) -> Result<u32, AnswerError> {
        if self.status != MatchStatus::Playing {
            return Err(AnswerError::NotPlaying);
        }
        if !self.participants.iter().any(|participant| participant.id == player_id) {
            return Err(AnswerError::UnknownPlayer);
        }
        if round != self.current_round {
            return Err(AnswerError::StaleRound);
        }
        if !self.answered.insert(player_id) {
            return Err(AnswerError::AlreadyAnswered);
        }

        let final_round = round.saturating_add(1) >= self.rounds();
        let participant = self
            .participant_mut(player_id)
            .ok_or(AnswerError::UnknownPlayer)?;
        participant.score = participant.score.saturating_add(score);
        if final_round {
            participant.finished = true;
        }
        Ok(participant.score)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::OpenLobby { room_id, host } => {
            world.seat_room(MatchMode::Multiplayer, room_id.clone(), host);
            world.status = MatchStatus::Lobby;
            out_events.push(Event::LobbyOpened { room_id });
        }
        Command::StartSolo { player, problems } => {
            if problems.is_empty() {
                out_events.push(Event::StartRejected {
                    reason: StartError::NoProblems,
                });
                return;
            }
            world.seat_room(MatchMode::Solo, LOCAL_ROOM.to_owned(), player);
            world.problems = problems;
            world.begin_playing(out_events);
        }
        Command::Join { player_id, seat } => {
            let rejection = match world.status {
                MatchStatus::Lobby => None,
                MatchStatus::Idle => Some(JoinError::RoomClosed),
                MatchStatus::Countdown | MatchStatus::Playing | MatchStatus::Ended => {
                    Some(JoinError::MatchInProgress)
                }
            };
            let rejection = rejection.or_else(|| {
                world
                    .participants
                    .iter()
                    .any(|participant| participant.id == player_id)
                    .then_some(JoinError::AlreadySeated)
            });
            if let Some(reason) = rejection {
                out_events.push(Event::JoinRejected { player_id, reason });
                return;
            }

            let Some(username) = normalize_username(&seat.username) else {
                out_events.push(Event::JoinRejected {
                    player_id,
                    reason: JoinError::InvalidName,
                });
                return;
            };

            world
                .participants
                .push(Participant::seated(player_id, username, &seat, false));
            out_events.push(Event::PlayerJoined { player_id });
        }
        Command::StartMatch { problems } => {
            if world.status != MatchStatus::Lobby {
                out_events.push(Event::StartRejected {
                    reason: StartError::InvalidStatus,
                });
                return;
            }
            if problems.is_empty() {
                out_events.push(Event::StartRejected {
                    reason: StartError::NoProblems,
                });
                return;
            }

            world.clear_scores();
            world.problems = problems;
            let countdown = world.config.countdown();
            if countdown.is_zero() {
                world.begin_playing(out_events);
            } else {
                world.status = MatchStatus::Countdown;
                world.current_round = 0;
                world.remaining = countdown;
                out_events.push(Event::CountdownStarted {
                    remaining: countdown,
                });
            }
        }
        Command::SubmitAnswer {
            player_id,
            round,
            score,
        } => match world.submit_answer(player_id, round, score) {
            Ok(total) => out_events.push(Event::AnswerAccepted {
                player_id,
                round,
                score,
                total,
            }),
            Err(reason) => out_events.push(Event::AnswerRejected { player_id, reason }),
        },
        Command::Tick { dt } => {
            out_events.push(Event::TimeAdvanced { dt });
            world.run_clock(dt, out_events);
        }
        Command::ResetLobby => {
            if world.status != MatchStatus::Ended || world.mode != MatchMode::Multiplayer {
                return;
            }
            world.clear_scores();
            world.problems.clear();
            world.current_round = 0;
            world.remaining = world.config.round_time();
            world.status = MatchStatus::Lobby;
            out_events.push(Event::LobbyReset);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use root_racer_core::{
        rank_players, GameState, MatchConfig, MatchMode, MatchStatus, PlayerId, PlayerState,
        Problem, Standing,
    };

    use super::World;

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Match configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> MatchConfig {
        world.config
    }

    /// Lifecycle stage of the room.
    #[must_use]
    pub fn status(world: &World) -> MatchStatus {
        world.status
    }

    /// Mode of the room.
    #[must_use]
    pub fn mode(world: &World) -> MatchMode {
        world.mode
    }

    /// Zero-based index of the round being played.
    #[must_use]
    pub fn current_round(world: &World) -> u32 {
        world.current_round
    }

    /// Problem for the round being played, if any.
    #[must_use]
    pub fn current_problem(world: &World) -> Option<&Problem> {
        usize::try_from(world.current_round)
            .ok()
            .and_then(|index| world.problems.get(index))
    }

    /// Time left in the current round or countdown.
    #[must_use]
    pub fn time_remaining(world: &World) -> Duration {
        world.remaining
    }

    /// Reports whether the player already answered the current round.
    #[must_use]
    pub fn has_answered(world: &World, player_id: PlayerId) -> bool {
        world.answered.contains(&player_id)
    }

    /// Captures the seated players in join order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerState> {
        world
            .participants
            .iter()
            .map(|participant| participant.to_state())
            .collect()
    }

    /// Captures a single seated player.
    #[must_use]
    pub fn player(world: &World, player_id: PlayerId) -> Option<PlayerState> {
        world
            .participants
            .iter()
            .find(|participant| participant.id == player_id)
            .map(|participant| participant.to_state())
    }

    /// Ranks the seated players by score.
    #[must_use]
    pub fn standings(world: &World) -> Vec<Standing> {
        rank_players(&players(world))
    }

    /// One-based placement of the player, if seated.
    #[must_use]
    pub fn placement_of(world: &World, player_id: PlayerId) -> Option<u32> {
        standings(world)
            .into_iter()
            .find(|standing| standing.player_id == player_id)
            .map(|standing| standing.placement)
    }

    /// Captures the complete broadcastable room state.
    #[must_use]
    pub fn snapshot(world: &World) -> GameState {
        GameState {
            status: world.status,
            mode: world.mode,
            room_id: world.room_id.clone(),
            host_id: world.host_id,
            players: players(world),
            current_round: world.current_round,
            problems: world.problems.clone(),
            time_remaining_secs: whole_seconds(world.remaining),
        }
    }

    fn whole_seconds(duration: Duration) -> u32 {
        let mut seconds = duration.as_secs();
        if duration.subsec_nanos() > 0 {
            seconds = seconds.saturating_add(1);
        }
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }
}

#[derive(Clone, Debug)]
struct Participant {
    id: PlayerId,
    username: String,
    rating: u32,
    matches_played: u32,
    score: u32,
    ready: bool,
    finished: bool,
}

impl Participant {
    fn seated(id: PlayerId, username: String, seat: &PlayerSeat, ready: bool) -> Self {
        Self {
            id,
            username,
            rating: seat.rating,
            matches_played: seat.matches_played,
            score: 0,
            ready,
            finished: false,
        }
    }

    fn to_state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            username: self.username.clone(),
            rating: self.rating,
            matches_played: self.matches_played,
            score: self.score,
            ready: self.ready,
            finished: self.finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use root_racer_core::{
        Command, Event, MatchConfig, PlayerSeat, Problem, ProblemId, ProblemKind,
    };

    use super::{apply, query, World};

    #[test]
    fn countdown_precedes_first_round() {
        let config = MatchConfig::new(2, Duration::from_secs(5), Duration::from_secs(3));
        let mut world = World::with_config(config);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::OpenLobby {
                room_id: "room".to_owned(),
                host: PlayerSeat::new("host", 1000, 0),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::StartMatch {
                problems: vec![Problem::new(ProblemId::new(0), ProblemKind::SquareRoot, 4)],
            },
            &mut events,
        );
        assert_eq!(query::time_remaining(&world), Duration::from_secs(3));

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(3),
            },
            &mut events,
        );
        assert!(events.contains(&Event::RoundStarted { round: 0 }));
        assert_eq!(query::time_remaining(&world), Duration::from_secs(5));
    }

    #[test]
    fn partial_seconds_round_up_in_snapshots() {
        let mut world = World::new();
        world.remaining = Duration::from_millis(1500);
        assert_eq!(query::snapshot(&world).time_remaining_secs, 2);
    }
}
