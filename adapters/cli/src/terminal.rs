//! Line-oriented terminal presentation.

use anyhow::Result;
use root_racer_core::{
    rank_players, GameState, MatchRecord, PlayerId, PlayerProfile, Problem, Rank,
};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};

const RECENT_MATCHES: usize = 5;

/// Reads trimmed lines typed by the player.
pub(crate) struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    pub(crate) fn stdin() -> Self {
        Self {
            lines: BufReader::new(io::stdin()).lines(),
        }
    }

    /// Next line, or `None` once stdin is closed.
    pub(crate) async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_owned()))
    }
}

pub(crate) fn is_quit(line: &str) -> bool {
    matches!(line, "q" | "quit" | "exit")
}

pub(crate) fn print_profile(profile: &PlayerProfile) {
    let rank = profile.rank();
    println!("{} ({})", profile.username, rank);
    match (rank, rank.threshold()) {
        (Rank::Unranked, _) => println!(
            "  Rating {}, placement matches played {}/{}",
            profile.rating,
            profile.matches_played,
            root_racer_core::PLACEMENT_MATCHES
        ),
        (_, Some(floor)) => println!("  Rating {} (tier floor {floor})", profile.rating),
        (_, None) => println!("  Rating {}", profile.rating),
    }
    println!(
        "  Matches {}, wins {}, best score {}",
        profile.matches_played, profile.wins, profile.best_score
    );
    if profile.history.is_empty() {
        return;
    }
    println!("  Recent matches:");
    for record in profile.history.iter().take(RECENT_MATCHES) {
        println!(
            "    {}  {:<11} #{}  {:>5} pts  {:+} RP",
            record.date.format("%Y-%m-%d"),
            record.mode.to_string(),
            record.placement,
            record.score,
            record.rating_change
        );
    }
}

pub(crate) fn print_lobby(state: &GameState, me: PlayerId) {
    println!("Lobby {} ({} seated):", state.room_id, state.players.len());
    for player in &state.players {
        let marker = if player.id == me { " (you)" } else { "" };
        let role = if player.id == state.host_id { " host" } else { "" };
        println!(
            "  {}{marker}{role}  {} {}",
            player.username,
            player.rank(),
            player.rating
        );
    }
}

pub(crate) fn print_countdown(state: &GameState) {
    println!("Match starts in {}s...", state.time_remaining_secs);
}

pub(crate) fn print_problem(state: &GameState, problem: &Problem) {
    println!();
    println!(
        "Round {}/{}: {} of {}  -> {}{}  ({}s)",
        state.current_round + 1,
        state.problems.len(),
        problem.kind.label(),
        problem.value,
        problem.kind.symbol(),
        problem.value,
        state.time_remaining_secs
    );
    println!("Your estimate:");
}

pub(crate) fn print_round_score(problem: &Problem, score: u32) {
    println!(
        "  +{score} points (exact answer {:.4}). Waiting for the round to finish...",
        problem.answer
    );
}

pub(crate) fn print_standings(state: &GameState, me: PlayerId) {
    println!();
    println!("Final standings:");
    for standing in rank_players(&state.players) {
        let name = state
            .player(standing.player_id)
            .map_or("?", |player| player.username.as_str());
        let marker = if standing.player_id == me { "  <- you" } else { "" };
        println!(
            "  {}. {:<12} {:>6} pts{marker}",
            standing.placement, name, standing.score
        );
    }
}

pub(crate) fn print_record(profile: &PlayerProfile, record: &MatchRecord) {
    println!(
        "Rating {} ({:+} RP), now {}.",
        profile.rating,
        record.rating_change,
        profile.rank()
    );
}
