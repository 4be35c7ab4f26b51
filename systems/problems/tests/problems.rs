use root_racer_core::{Command, MatchStatus, PlayerSeat, ProblemId, ProblemKind};
use root_racer_system_problems::{max_value, ProblemGenerator};
use root_racer_world::{self as world, query, World};

#[test]
fn identical_seeds_produce_identical_sets() {
    let first = ProblemGenerator::new(0x5eed).generate_set(32);
    let second = ProblemGenerator::new(0x5eed).generate_set(32);
    assert_eq!(first, second);

    let other = ProblemGenerator::new(0x5eee).generate_set(32);
    assert_ne!(first, other, "different seeds should diverge");
}

#[test]
fn problems_are_numbered_and_within_range() {
    let problems = ProblemGenerator::new(7).generate_set(500);
    for (index, problem) in problems.iter().enumerate() {
        assert_eq!(problem.id, ProblemId::new(index as u32));
        assert!(problem.value >= 2, "value {} below minimum", problem.value);
        assert!(problem.value <= max_value(), "value {} above maximum", problem.value);
    }
}

#[test]
fn answers_are_exact_roots() {
    for problem in ProblemGenerator::new(99).generate_set(100) {
        let reconstructed = match problem.kind {
            ProblemKind::SquareRoot => problem.answer.powi(2),
            ProblemKind::CubeRoot => problem.answer.powi(3),
        };
        let relative = (reconstructed - problem.value as f64).abs() / problem.value as f64;
        assert!(relative < 1e-9, "answer drifted for {problem:?}");
    }
}

#[test]
fn square_roots_dominate_the_mix() {
    let problems = ProblemGenerator::new(2024).generate_set(4000);
    let square = problems
        .iter()
        .filter(|problem| problem.kind == ProblemKind::SquareRoot)
        .count();
    let ratio = square as f64 / problems.len() as f64;
    assert!(
        (0.55..0.65).contains(&ratio),
        "square root share {ratio} strayed from 60%"
    );
}

#[test]
fn generated_set_drives_a_solo_match() {
    let mut generator = ProblemGenerator::new(1);
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::StartSolo {
            player: PlayerSeat::new("solo", 1000, 0),
            problems: generator.generate_set(5),
        },
        &mut events,
    );

    assert_eq!(query::status(&world), MatchStatus::Playing);
    let problem = query::current_problem(&world).expect("first problem");
    assert_eq!(problem.id, ProblemId::new(0));
}
