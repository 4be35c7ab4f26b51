#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scoring system that turns a guess into points.
//!
//! A perfect, instant answer is worth 1200 points: up to 1000 for accuracy
//! and up to 200 for speed. Accuracy falls off linearly with the relative
//! error and bottoms out at zero once the guess is off by the full answer.

use std::time::Duration;

use root_racer_core::Problem;
use thiserror::Error;

/// Points awarded for an exact guess.
pub const ACCURACY_POINTS: f64 = 1000.0;

/// Points awarded for answering the instant a round starts.
pub const SPEED_POINTS: f64 = 200.0;

/// Errors raised when reading a guess typed by a player.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuessError {
    /// Nothing was entered.
    #[error("guess is empty")]
    Empty,
    /// The input was not a finite number.
    #[error("'{0}' is not a number")]
    NotANumber(String),
}

/// Parses a typed guess into a finite number.
pub fn parse_guess(input: &str) -> Result<f64, GuessError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GuessError::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(GuessError::NotANumber(trimmed.to_owned())),
    }
}

/// Scores a guess against the exact answer.
///
/// `time_taken` is measured from the start of the round; answers slower than
/// `total_time` earn no speed bonus.
#[must_use]
pub fn calculate_score(actual: f64, guess: f64, time_taken: Duration, total_time: Duration) -> u32 {
    let accuracy = accuracy(actual, guess);
    let speed = speed(time_taken, total_time);
    let points = (accuracy * ACCURACY_POINTS + speed * SPEED_POINTS).floor();
    if points <= 0.0 {
        0
    } else {
        points as u32
    }
}

/// Scores a guess for the provided problem.
#[must_use]
pub fn score_guess(problem: &Problem, guess: f64, time_taken: Duration, round_time: Duration) -> u32 {
    calculate_score(problem.answer, guess, time_taken, round_time)
}

fn accuracy(actual: f64, guess: f64) -> f64 {
    if !guess.is_finite() || !actual.is_finite() || actual <= 0.0 {
        return 0.0;
    }
    (1.0 - (actual - guess).abs() / actual).max(0.0)
}

fn speed(time_taken: Duration, total_time: Duration) -> f64 {
    if total_time.is_zero() {
        return 0.0;
    }
    let total = total_time.as_secs_f64();
    ((total - time_taken.as_secs_f64()) / total).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_round_time_gives_no_speed_bonus() {
        assert_eq!(speed(Duration::ZERO, Duration::ZERO), 0.0);
    }

    #[test]
    fn non_finite_guess_has_no_accuracy() {
        assert_eq!(accuracy(10.0, f64::NAN), 0.0);
        assert_eq!(accuracy(10.0, f64::INFINITY), 0.0);
    }
}
