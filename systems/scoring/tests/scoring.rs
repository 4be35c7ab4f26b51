use std::time::Duration;

use root_racer_core::{Problem, ProblemId, ProblemKind, ROUND_TIME};
use root_racer_system_scoring::{calculate_score, parse_guess, score_guess, GuessError};

#[test]
fn perfect_instant_answer_earns_full_marks() {
    assert_eq!(calculate_score(100.0, 100.0, Duration::ZERO, ROUND_TIME), 1200);
}

#[test]
fn perfect_answer_at_the_buzzer_earns_accuracy_only() {
    assert_eq!(calculate_score(100.0, 100.0, ROUND_TIME, ROUND_TIME), 1000);
    assert_eq!(
        calculate_score(100.0, 100.0, Duration::from_secs(45), ROUND_TIME),
        1000,
        "late answers never lose points"
    );
}

#[test]
fn accuracy_falls_off_linearly() {
    // 10% off, halfway through the round: 900 + 100.
    assert_eq!(
        calculate_score(50.0, 45.0, Duration::from_secs(10), ROUND_TIME),
        1000
    );
    assert_eq!(
        calculate_score(50.0, 55.0, Duration::from_secs(10), ROUND_TIME),
        1000
    );
}

#[test]
fn wild_guesses_keep_only_the_speed_bonus() {
    assert_eq!(calculate_score(10.0, 30.0, Duration::ZERO, ROUND_TIME), 200);
    assert_eq!(calculate_score(10.0, -5.0, ROUND_TIME, ROUND_TIME), 0);
}

#[test]
fn scores_are_floored() {
    // accuracy 1 - 1/3 = 0.666.. -> 666.66.., speed (20 - 19) / 20 -> 10.
    assert_eq!(
        calculate_score(3.0, 2.0, Duration::from_secs(19), ROUND_TIME),
        676
    );
}

#[test]
fn score_guess_uses_problem_answer() {
    let problem = Problem::new(ProblemId::new(0), ProblemKind::SquareRoot, 10_000);
    assert_eq!(
        score_guess(&problem, 100.0, Duration::ZERO, ROUND_TIME),
        1200
    );
}

#[test]
fn guesses_parse_from_trimmed_input() {
    assert_eq!(parse_guess(" 31.62 "), Ok(31.62));
    assert_eq!(parse_guess(""), Err(GuessError::Empty));
    assert_eq!(
        parse_guess("abc"),
        Err(GuessError::NotANumber("abc".to_owned()))
    );
    assert_eq!(
        parse_guess("NaN"),
        Err(GuessError::NotANumber("NaN".to_owned()))
    );
}
