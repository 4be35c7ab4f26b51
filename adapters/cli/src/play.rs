//! Turns a stream of room states into what the player sees and scores.
//!
//! Solo, host and guest sessions all feed their latest [`GameState`] into a
//! [`MatchView`], which prints transitions and prices typed guesses.

use std::time::{Duration, Instant};

use root_racer_core::{GameState, MatchStatus, PlayerId};
use root_racer_system_scoring::{parse_guess, score_guess};

use crate::terminal;

/// Noteworthy change observed between two states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    RoundStarted,
    MatchEnded,
}

/// Score computed for the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Answer {
    pub(crate) round: u32,
    pub(crate) score: u32,
}

#[derive(Debug)]
struct RoundClock {
    round: u32,
    started: Instant,
    length: Duration,
    answered: bool,
}

pub(crate) struct MatchView {
    me: PlayerId,
    status: Option<MatchStatus>,
    seated: usize,
    clock: Option<RoundClock>,
}

impl MatchView {
    pub(crate) fn new(me: PlayerId) -> Self {
        Self {
            me,
            status: None,
            seated: 0,
            clock: None,
        }
    }

    /// Prints whatever changed since the previous state.
    pub(crate) fn update(&mut self, state: &GameState) -> Option<Transition> {
        let previous = self.status.replace(state.status);
        let status_changed = previous != Some(state.status);
        let seated_changed = std::mem::replace(&mut self.seated, state.players.len())
            != state.players.len();

        match state.status {
            MatchStatus::Idle => None,
            MatchStatus::Lobby => {
                if status_changed || seated_changed {
                    self.clock = None;
                    terminal::print_lobby(state, self.me);
                }
                None
            }
            MatchStatus::Countdown => {
                if status_changed {
                    terminal::print_countdown(state);
                }
                None
            }
            MatchStatus::Playing => {
                let fresh = self
                    .clock
                    .as_ref()
                    .map_or(true, |clock| clock.round != state.current_round);
                if !fresh {
                    return None;
                }
                let problem = state.current_problem()?;
                self.clock = Some(RoundClock {
                    round: state.current_round,
                    started: Instant::now(),
                    length: Duration::from_secs(u64::from(state.time_remaining_secs)),
                    answered: false,
                });
                terminal::print_problem(state, problem);
                Some(Transition::RoundStarted)
            }
            MatchStatus::Ended => {
                if !status_changed {
                    return None;
                }
                self.clock = None;
                terminal::print_standings(state, self.me);
                Some(Transition::MatchEnded)
            }
        }
    }

    /// Scores a typed guess against the round being played.
    ///
    /// Returns `None` after printing why the line could not be used.
    pub(crate) fn answer(&mut self, state: &GameState, line: &str) -> Option<Answer> {
        let Some(clock) = self.clock.as_mut() else {
            println!("No round is running.");
            return None;
        };
        if clock.answered {
            println!("You already answered this round.");
            return None;
        }
        let problem = state.current_problem()?;
        let guess = match parse_guess(line) {
            Ok(guess) => guess,
            Err(error) => {
                println!("  {error}; try again.");
                return None;
            }
        };
        let elapsed = clock.started.elapsed().min(clock.length);
        let score = score_guess(problem, guess, elapsed, clock.length);
        clock.answered = true;
        terminal::print_round_score(problem, score);
        Some(Answer {
            round: clock.round,
            score,
        })
    }
}
