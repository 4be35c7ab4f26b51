//! Practice matches played against the clock without a network.

use std::time::Duration;

use anyhow::Result;
use root_racer_core::{Command, MatchConfig, MatchStatus, PlayerProfile, PlayerSeat, HOST_SEAT};
use root_racer_storage::ProfileStore;
use root_racer_system_problems::ProblemGenerator;
use root_racer_system_rating::outcome_for;
use root_racer_world::{self as world, query, World};
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::{
    play::MatchView,
    terminal::{self, Input},
};

const TICK: Duration = Duration::from_secs(1);

pub(crate) async fn run(
    store: &ProfileStore,
    profile: &PlayerProfile,
    config: MatchConfig,
    seed: Option<u64>,
) -> Result<()> {
    let mut generator = seed.map_or_else(ProblemGenerator::from_entropy, ProblemGenerator::new);
    let mut world = World::with_config(config);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::StartSolo {
            player: PlayerSeat::from_profile(profile),
            problems: generator.generate_set(config.rounds()),
        },
        &mut events,
    );
    println!(
        "{} {} rounds, {}s each. Type an estimate and press Enter.",
        query::welcome_banner(&world),
        config.rounds(),
        config.round_time().as_secs()
    );

    let mut view = MatchView::new(HOST_SEAT);
    let _ = view.update(&query::snapshot(&world));
    let mut input = Input::stdin();
    let mut ticker = time::interval_at(time::Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while query::status(&world) != MatchStatus::Ended {
        tokio::select! {
            _ = ticker.tick() => {
                events.clear();
                world::apply(&mut world, Command::Tick { dt: TICK }, &mut events);
                let _ = view.update(&query::snapshot(&world));
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    println!("Input closed; practice abandoned.");
                    return Ok(());
                };
                if terminal::is_quit(&line) {
                    println!("Practice abandoned.");
                    return Ok(());
                }
                let state = query::snapshot(&world);
                if let Some(answer) = view.answer(&state, &line) {
                    events.clear();
                    world::apply(
                        &mut world,
                        Command::SubmitAnswer {
                            player_id: HOST_SEAT,
                            round: answer.round,
                            score: answer.score,
                        },
                        &mut events,
                    );
                    debug!(?events, "answer applied");
                }
            }
        }
    }

    let state = query::snapshot(&world);
    if let Some(outcome) = outcome_for(&state, HOST_SEAT) {
        if let Some((profile, record)) = store.record_match(outcome)? {
            terminal::print_record(&profile, &record);
        }
    }
    Ok(())
}
