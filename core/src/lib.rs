#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Root Racer game.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative room world, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values that adapters
//! relay to players. Systems are pure functions over snapshots such as
//! [`GameState`] and never mutate the room directly.

pub mod protocol;

use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Root Racer.";

/// Number of rounds played in a match unless configured otherwise.
pub const TOTAL_ROUNDS: u32 = 5;

/// Time allotted to each round unless configured otherwise.
pub const ROUND_TIME: Duration = Duration::from_secs(20);

/// Upper bound on the digit count of generated problem values.
pub const MAX_DIGITS: u32 = 6;

/// Rating assigned to freshly created profiles.
pub const STARTING_RATING: u32 = 1000;

/// Matches a profile must complete before it receives a rank tier.
pub const PLACEMENT_MATCHES: u32 = 5;

/// Maximum number of match records retained in a profile history.
pub const HISTORY_LIMIT: usize = 50;

/// Maximum number of characters kept from a username.
pub const USERNAME_MAX_CHARS: usize = 12;

/// Room identifier used by solo matches that never touch the network.
pub const LOCAL_ROOM: &str = "LOCAL";

/// Seat that the world assigns to the room host and to solo players.
pub const HOST_SEAT: PlayerId = PlayerId::new(1);

/// Commands that express all permissible room mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Opens a multiplayer lobby seated with the hosting player.
    OpenLobby {
        /// Shareable identifier of the room.
        room_id: String,
        /// Player that hosts the room.
        host: PlayerSeat,
    },
    /// Starts a solo match immediately using the provided problem set.
    StartSolo {
        /// Player taking part in the solo match.
        player: PlayerSeat,
        /// Problems answered round by round.
        problems: Vec<Problem>,
    },
    /// Requests that a guest take a seat in the lobby.
    Join {
        /// Seat assigned to the guest by the relay.
        player_id: PlayerId,
        /// Details the guest presented when joining.
        seat: PlayerSeat,
    },
    /// Starts a multiplayer match from the lobby.
    StartMatch {
        /// Problems answered round by round.
        problems: Vec<Problem>,
    },
    /// Credits a player with the score earned for a round.
    SubmitAnswer {
        /// Player submitting the answer.
        player_id: PlayerId,
        /// Zero-based round the answer belongs to.
        round: u32,
        /// Score computed for the answer.
        score: u32,
    },
    /// Advances the room clock by the provided delta time.
    Tick {
        /// Duration of time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Returns a finished multiplayer room to its lobby.
    ResetLobby,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the room clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a multiplayer lobby opened.
    LobbyOpened {
        /// Shareable identifier of the room.
        room_id: String,
    },
    /// Confirms that a guest took a seat.
    PlayerJoined {
        /// Seat occupied by the guest.
        player_id: PlayerId,
    },
    /// Reports that a join request was refused.
    JoinRejected {
        /// Seat the relay attempted to fill.
        player_id: PlayerId,
        /// Specific reason the join failed.
        reason: JoinError,
    },
    /// Announces the pre-match countdown.
    CountdownStarted {
        /// Time left before the first round begins.
        remaining: Duration,
    },
    /// Announces that a match began.
    MatchStarted {
        /// Mode of the match that started.
        mode: MatchMode,
        /// Number of rounds the match consists of.
        rounds: u32,
    },
    /// Reports that a match start request was refused.
    StartRejected {
        /// Specific reason the start failed.
        reason: StartError,
    },
    /// Announces that a round began.
    RoundStarted {
        /// Zero-based index of the round.
        round: u32,
    },
    /// Confirms that an answer was credited.
    AnswerAccepted {
        /// Player that answered.
        player_id: PlayerId,
        /// Round the answer belongs to.
        round: u32,
        /// Score credited for the answer.
        score: u32,
        /// Player's total score after the answer.
        total: u32,
    },
    /// Reports that an answer was refused.
    AnswerRejected {
        /// Player that attempted to answer.
        player_id: PlayerId,
        /// Specific reason the answer failed.
        reason: AnswerError,
    },
    /// Announces the end of a match.
    MatchEnded {
        /// Final standings ordered by placement.
        standings: Vec<Standing>,
    },
    /// Confirms that a finished room returned to its lobby.
    LobbyReset,
}

impl Event {
    /// Reports whether the event mutated the broadcastable room state.
    #[must_use]
    pub const fn changes_state(&self) -> bool {
        matches!(
            self,
            Self::LobbyOpened { .. }
                | Self::PlayerJoined { .. }
                | Self::CountdownStarted { .. }
                | Self::MatchStarted { .. }
                | Self::RoundStarted { .. }
                | Self::AnswerAccepted { .. }
                | Self::MatchEnded { .. }
                | Self::LobbyReset
        )
    }
}

/// Reasons a join request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinError {
    /// A player already occupies the requested seat.
    #[error("seat is already taken")]
    AlreadySeated,
    /// The username was blank after trimming.
    #[error("username must not be blank")]
    InvalidName,
    /// The room is not accepting players because a match is underway.
    #[error("a match is already in progress")]
    MatchInProgress,
    /// No lobby has been opened.
    #[error("room is not open")]
    RoomClosed,
}

impl JoinError {
    /// Stable machine-readable code sent to remote players.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AlreadySeated => "ALREADY_SEATED",
            Self::InvalidName => "INVALID_NAME",
            Self::MatchInProgress => "MATCH_IN_PROGRESS",
            Self::RoomClosed => "ROOM_CLOSED",
        }
    }
}

/// Reasons a match start request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartError {
    /// The room is not waiting in its lobby.
    #[error("matches can only start from the lobby")]
    InvalidStatus,
    /// The problem set was empty.
    #[error("a match needs at least one problem")]
    NoProblems,
}

/// Reasons an answer may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerError {
    /// No round is currently being played.
    #[error("no round is being played")]
    NotPlaying,
    /// The player does not occupy a seat in the room.
    #[error("player is not seated in the room")]
    UnknownPlayer,
    /// The answer targets a round other than the current one.
    #[error("answer arrived for a different round")]
    StaleRound,
    /// The player already answered the current round.
    #[error("round was already answered")]
    AlreadyAnswered,
}

impl AnswerError {
    /// Stable machine-readable code sent to remote players.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotPlaying => "NOT_PLAYING",
            Self::UnknownPlayer => "UNKNOWN_PLAYER",
            Self::StaleRound => "STALE_ROUND",
            Self::AlreadyAnswered => "ALREADY_ANSWERED",
        }
    }
}

/// Room seat assigned to a participant by the host.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a problem within its problem set.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProblemId(u32);

impl ProblemId {
    /// Creates a new problem identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Kind of root a problem asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemKind {
    /// Estimate the square root of the value.
    #[serde(rename = "SQRT")]
    SquareRoot,
    /// Estimate the cube root of the value.
    #[serde(rename = "CBRT")]
    CubeRoot,
}

impl ProblemKind {
    /// Computes the exact root of `value` for this kind.
    #[must_use]
    pub fn root(self, value: u64) -> f64 {
        let value = value as f64;
        match self {
            Self::SquareRoot => value.sqrt(),
            Self::CubeRoot => value.cbrt(),
        }
    }

    /// Radical sign used when presenting the problem.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::SquareRoot => "√",
            Self::CubeRoot => "∛",
        }
    }

    /// Human-readable name of the root.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SquareRoot => "square root",
            Self::CubeRoot => "cube root",
        }
    }
}

/// Single estimation problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Position of the problem within its set.
    pub id: ProblemId,
    /// Kind of root requested.
    pub kind: ProblemKind,
    /// Number whose root must be estimated.
    pub value: u64,
    /// Exact root of the value.
    pub answer: f64,
}

impl Problem {
    /// Creates a problem and computes its exact answer.
    #[must_use]
    pub fn new(id: ProblemId, kind: ProblemKind, value: u64) -> Self {
        Self {
            id,
            kind,
            value,
            answer: kind.root(value),
        }
    }
}

/// Describes whether a match is played alone or against peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// Practice match played locally.
    Solo,
    /// Match played in a hosted room.
    Multiplayer,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solo => write!(f, "Solo"),
            Self::Multiplayer => write!(f, "Multiplayer"),
        }
    }
}

/// Lifecycle stage of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// No room has been opened yet.
    Idle,
    /// Players are gathering before the match.
    Lobby,
    /// The match is about to begin.
    Countdown,
    /// Rounds are being played.
    Playing,
    /// The match finished and standings are final.
    Ended,
}

/// Details a participant brings to a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSeat {
    /// Display name of the participant.
    pub username: String,
    /// Rating at the time of joining.
    pub rating: u32,
    /// Completed matches at the time of joining.
    pub matches_played: u32,
}

impl PlayerSeat {
    /// Creates a seat description from explicit values.
    #[must_use]
    pub fn new(username: impl Into<String>, rating: u32, matches_played: u32) -> Self {
        Self {
            username: username.into(),
            rating,
            matches_played,
        }
    }

    /// Derives the seat presented by the owner of a stored profile.
    #[must_use]
    pub fn from_profile(profile: &PlayerProfile) -> Self {
        Self::new(
            profile.username.clone(),
            profile.rating,
            profile.matches_played,
        )
    }
}

/// Per-player state shared with every participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Seat occupied by the player.
    pub id: PlayerId,
    /// Display name of the player.
    pub username: String,
    /// Rating at the time of joining.
    pub rating: u32,
    /// Completed matches at the time of joining.
    pub matches_played: u32,
    /// Score accumulated in the current match.
    pub score: u32,
    /// Indicates whether the player is ready to start.
    pub ready: bool,
    /// Indicates whether the player answered the final round.
    pub finished: bool,
}

impl PlayerState {
    /// Rank tier implied by the rating the player joined with.
    #[must_use]
    pub fn rank(&self) -> Rank {
        Rank::for_rating(self.rating, self.matches_played)
    }
}

/// Complete room state broadcast by the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Lifecycle stage of the room.
    pub status: MatchStatus,
    /// Mode of the room.
    pub mode: MatchMode,
    /// Shareable identifier of the room.
    pub room_id: String,
    /// Seat occupied by the host.
    pub host_id: PlayerId,
    /// Seated players in join order.
    pub players: Vec<PlayerState>,
    /// Zero-based index of the round being played.
    pub current_round: u32,
    /// Problems of the current match.
    pub problems: Vec<Problem>,
    /// Whole seconds left in the current round or countdown.
    pub time_remaining_secs: u32,
}

impl GameState {
    /// Problem for the round being played, if any.
    #[must_use]
    pub fn current_problem(&self) -> Option<&Problem> {
        usize::try_from(self.current_round)
            .ok()
            .and_then(|index| self.problems.get(index))
    }

    /// Looks up a seated player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|player| player.id == id)
    }
}

/// Final or provisional ranking of a player within a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Player being ranked.
    pub player_id: PlayerId,
    /// Score accumulated by the player.
    pub score: u32,
    /// One-based placement, where one is the winner.
    pub placement: u32,
}

/// Timing parameters for a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchConfig {
    rounds: u32,
    round_time: Duration,
    countdown: Duration,
}

impl MatchConfig {
    /// Creates a configuration with explicit timing values.
    ///
    /// A zero round count is raised to one so a started match always has a
    /// round to play.
    #[must_use]
    pub fn new(rounds: u32, round_time: Duration, countdown: Duration) -> Self {
        Self {
            rounds: rounds.max(1),
            round_time,
            countdown,
        }
    }

    /// Number of rounds in a match.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Time allotted to each round.
    #[must_use]
    pub const fn round_time(&self) -> Duration {
        self.round_time
    }

    /// Delay between the start request and the first round.
    #[must_use]
    pub const fn countdown(&self) -> Duration {
        self.countdown
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new(TOTAL_ROUNDS, ROUND_TIME, Duration::ZERO)
    }
}

/// Named rating tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    /// Profile has not finished its placement matches.
    Unranked,
    /// Rating below 800.
    Bronze,
    /// Rating of at least 800.
    Silver,
    /// Rating of at least 1200.
    Gold,
    /// Rating of at least 1600.
    Platinum,
    /// Rating of at least 2000.
    Legendary,
}

impl Rank {
    /// Buckets a rating into its tier.
    #[must_use]
    pub const fn for_rating(rating: u32, matches_played: u32) -> Self {
        if matches_played < PLACEMENT_MATCHES {
            return Self::Unranked;
        }
        match rating {
            2000.. => Self::Legendary,
            1600.. => Self::Platinum,
            1200.. => Self::Gold,
            800.. => Self::Silver,
            _ => Self::Bronze,
        }
    }

    /// Lowest rating that belongs to the tier.
    #[must_use]
    pub const fn threshold(self) -> Option<u32> {
        match self {
            Self::Unranked => None,
            Self::Bronze => Some(0),
            Self::Silver => Some(800),
            Self::Gold => Some(1200),
            Self::Platinum => Some(1600),
            Self::Legendary => Some(2000),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unranked => "Unranked",
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
            Self::Legendary => "Legendary",
        };
        f.write_str(name)
    }
}

/// Locally persisted player profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Unique identifier of the profile.
    pub id: String,
    /// Display name of the player.
    pub username: String,
    /// Current rating.
    pub rating: u32,
    /// Number of completed matches.
    pub matches_played: u32,
    /// Number of matches finished in first place.
    pub wins: u32,
    /// Highest score achieved in a single match.
    pub best_score: u32,
    /// Most recent matches, newest first.
    pub history: Vec<MatchRecord>,
}

impl PlayerProfile {
    /// Rank tier implied by the profile's rating.
    #[must_use]
    pub fn rank(&self) -> Rank {
        Rank::for_rating(self.rating, self.matches_played)
    }
}

/// Summary of a completed match stored in a profile history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Moment the match was recorded.
    pub date: DateTime<Utc>,
    /// Mode of the match.
    pub mode: MatchMode,
    /// Rating points gained or lost.
    pub rating_change: i32,
    /// Score achieved in the match.
    pub score: u32,
    /// One-based placement achieved in the match.
    pub placement: u32,
}

/// Result of a match from one player's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Mode of the match.
    pub mode: MatchMode,
    /// Score achieved by the player.
    pub score: u32,
    /// One-based placement of the player.
    pub placement: u32,
    /// Number of players that took part.
    pub total_players: u32,
}

/// Orders players by score, highest first, and assigns placements.
///
/// Players with equal scores keep their relative join order, so the earlier
/// joiner receives the better placement.
#[must_use]
pub fn rank_players(players: &[PlayerState]) -> Vec<Standing> {
    let mut ordered: Vec<&PlayerState> = players.iter().collect();
    ordered.sort_by(|left, right| right.score.cmp(&left.score));
    ordered
        .into_iter()
        .zip(1u32..)
        .map(|(player, placement)| Standing {
            player_id: player.id,
            score: player.score,
            placement,
        })
        .collect()
}

/// Normalises a username by trimming whitespace and truncating it.
///
/// Returns `None` when nothing remains after trimming.
#[must_use]
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(USERNAME_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_username, rank_players, AnswerError, Event, JoinError, PlayerId, PlayerState,
        ProblemKind, Rank, StartError,
    };

    fn player(id: u32, score: u32) -> PlayerState {
        PlayerState {
            id: PlayerId::new(id),
            username: format!("p{id}"),
            rating: 1000,
            matches_played: 0,
            score,
            ready: true,
            finished: false,
        }
    }

    #[test]
    fn ties_keep_join_order() {
        let players = vec![player(1, 300), player(2, 900), player(3, 300)];
        let placements: Vec<(u32, u32)> = rank_players(&players)
            .into_iter()
            .map(|standing| (standing.player_id.get(), standing.placement))
            .collect();
        assert_eq!(placements, vec![(2, 1), (1, 2), (3, 3)]);
    }

    #[test]
    fn rank_requires_placement_matches() {
        assert_eq!(Rank::for_rating(2500, 4), Rank::Unranked);
        assert_eq!(Rank::for_rating(2500, 5), Rank::Legendary);
    }

    #[test]
    fn rank_thresholds_are_inclusive() {
        assert_eq!(Rank::for_rating(799, 10), Rank::Bronze);
        assert_eq!(Rank::for_rating(800, 10), Rank::Silver);
        assert_eq!(Rank::for_rating(1200, 10), Rank::Gold);
        assert_eq!(Rank::for_rating(1599, 10), Rank::Gold);
        assert_eq!(Rank::for_rating(1600, 10), Rank::Platinum);
        assert_eq!(Rank::for_rating(2000, 10), Rank::Legendary);
        assert_eq!(Rank::Gold.threshold(), Some(1200));
    }

    #[test]
    fn roots_match_kind() {
        assert!((ProblemKind::SquareRoot.root(144) - 12.0).abs() < f64::EPSILON);
        assert!((ProblemKind::CubeRoot.root(27) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn usernames_are_trimmed_and_truncated() {
        assert_eq!(normalize_username("   "), None);
        assert_eq!(normalize_username("  ada "), Some("ada".to_owned()));
        assert_eq!(
            normalize_username("abcdefghijklmnop"),
            Some("abcdefghijkl".to_owned())
        );
    }

    #[test]
    fn rejections_do_not_change_state() {
        assert!(!Event::StartRejected {
            reason: StartError::NoProblems
        }
        .changes_state());
        assert!(Event::LobbyReset.changes_state());
    }

    #[test]
    fn rejection_reasons_are_errors_with_messages() {
        fn as_error(error: &dyn std::error::Error) -> String {
            error.to_string()
        }

        assert_eq!(
            as_error(&JoinError::MatchInProgress),
            "a match is already in progress"
        );
        assert_eq!(
            as_error(&StartError::NoProblems),
            "a match needs at least one problem"
        );
        assert_eq!(
            as_error(&AnswerError::AlreadyAnswered),
            "round was already answered"
        );
        assert_eq!(AnswerError::AlreadyAnswered.code(), "ALREADY_ANSWERED");
    }
}
