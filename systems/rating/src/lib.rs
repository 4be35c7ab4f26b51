#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rating and progression system applied to profiles after each match.

use chrono::{DateTime, Utc};
use root_racer_core::{
    rank_players, GameState, MatchMode, MatchOutcome, MatchRecord, PlayerId, PlayerProfile,
    PlayerState, Standing, HISTORY_LIMIT,
};

/// Rating points exchanged per placement step in multiplayer matches.
pub const PLACEMENT_STEP: i32 = 25;

/// Solo score above which the larger solo bonus is awarded.
pub const SOLO_BONUS_THRESHOLD: u32 = 2000;

const SOLO_BONUS: i32 = 5;
const SOLO_PARTICIPATION: i32 = 1;

/// Computes final standings for the provided players.
#[must_use]
pub fn placements(players: &[PlayerState]) -> Vec<Standing> {
    rank_players(players)
}

/// Builds the outcome of a finished match for a single player.
///
/// Returns `None` when the player is not seated in the room.
#[must_use]
pub fn outcome_for(state: &GameState, player_id: PlayerId) -> Option<MatchOutcome> {
    let standing = placements(&state.players)
        .into_iter()
        .find(|standing| standing.player_id == player_id)?;
    Some(MatchOutcome {
        mode: state.mode,
        score: standing.score,
        placement: standing.placement,
        total_players: u32::try_from(state.players.len()).unwrap_or(u32::MAX),
    })
}

/// Rating points gained or lost for an outcome.
///
/// Multiplayer rewards finishing above the middle of the table and
/// penalises finishing below it; solo only ever adds points.
#[must_use]
pub fn rating_change(outcome: &MatchOutcome) -> i32 {
    match outcome.mode {
        MatchMode::Solo => {
            if outcome.score > SOLO_BONUS_THRESHOLD {
                SOLO_BONUS
            } else {
                SOLO_PARTICIPATION
            }
        }
        MatchMode::Multiplayer => {
            let total = i64::from(outcome.total_players);
            let placement = i64::from(outcome.placement);
            // floor(((total + 1) / 2 - placement) * step), kept in integers.
            let doubled = (total + 1 - 2 * placement) * i64::from(PLACEMENT_STEP);
            let change = doubled.div_euclid(2);
            i32::try_from(change).unwrap_or(if change < 0 { i32::MIN } else { i32::MAX })
        }
    }
}

/// Applies an outcome to a profile and returns the record that was stored.
pub fn apply_outcome(
    profile: &mut PlayerProfile,
    outcome: MatchOutcome,
    date: DateTime<Utc>,
) -> MatchRecord {
    let change = rating_change(&outcome);
    profile.rating = profile.rating.saturating_add_signed(change);
    profile.matches_played = profile.matches_played.saturating_add(1);
    if outcome.placement == 1 {
        profile.wins = profile.wins.saturating_add(1);
    }
    profile.best_score = profile.best_score.max(outcome.score);

    let record = MatchRecord {
        date,
        mode: outcome.mode,
        rating_change: change,
        score: outcome.score,
        placement: outcome.placement,
    };
    profile.history.insert(0, record.clone());
    profile.history.truncate(HISTORY_LIMIT);
    record
}
