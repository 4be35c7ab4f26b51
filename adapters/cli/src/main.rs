#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for Root Racer.
//!
//! Players estimate square and cube roots against the clock, alone or in a
//! room hosted by one of them on the local network.

mod multiplayer;
mod play;
mod solo;
mod terminal;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use root_racer_core::{MatchConfig, PlayerProfile, ROUND_TIME, TOTAL_ROUNDS};
use root_racer_net::HostConfig;
use root_racer_storage::ProfileStore;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROFILE: &str = "root-racer-profile.json";
const DEFAULT_BIND: &str = "0.0.0.0:4455";

#[derive(Debug, Parser)]
#[command(
    name = "root-racer",
    version,
    about = "Race to estimate square and cube roots"
)]
struct Cli {
    /// Profile file to read and update.
    #[arg(long, global = true, env = "ROOT_RACER_PROFILE", default_value = DEFAULT_PROFILE)]
    profile: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the local player profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Play an unranked practice match alone.
    Solo(MatchArgs),
    /// Host a multiplayer room others can join.
    Host {
        /// Address to listen on.
        #[arg(long, env = "ROOT_RACER_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
        /// Address to put in the invite code, for example when the room is
        /// reached through port forwarding. Defaults to this machine's
        /// outbound interface.
        #[arg(long, env = "ROOT_RACER_ADVERTISE")]
        advertise: Option<SocketAddr>,
        /// Seconds of countdown between starting a match and its first round.
        #[arg(long, default_value_t = 0)]
        countdown_secs: u64,
        #[command(flatten)]
        args: MatchArgs,
    },
    /// Join a room using an invite code or host:port address.
    Join {
        /// Invite code printed by the host.
        code: String,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// Create a fresh profile, replacing any existing one.
    Create {
        /// Display name, at most twelve characters.
        username: String,
    },
    /// Show rank, statistics and recent matches.
    Show,
    /// Delete the stored profile.
    Logout,
}

#[derive(Debug, Args)]
struct MatchArgs {
    /// Number of rounds per match.
    #[arg(long, default_value_t = TOTAL_ROUNDS)]
    rounds: u32,
    /// Seconds allowed per round.
    #[arg(long, default_value_t = ROUND_TIME.as_secs())]
    round_secs: u64,
    /// Seed for reproducible problem sets.
    #[arg(long)]
    seed: Option<u64>,
}

impl MatchArgs {
    fn config(&self, countdown: Duration) -> Result<MatchConfig> {
        if self.round_secs == 0 {
            bail!("rounds must last at least one second");
        }
        Ok(MatchConfig::new(
            self.rounds,
            Duration::from_secs(self.round_secs),
            countdown,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = ProfileStore::new(cli.profile);

    match cli.command {
        Commands::Profile { command } => run_profile(&store, command),
        Commands::Solo(args) => {
            let profile = require_profile(&store)?;
            solo::run(&store, &profile, args.config(Duration::ZERO)?, args.seed).await
        }
        Commands::Host {
            bind,
            advertise,
            countdown_secs,
            args,
        } => {
            let profile = require_profile(&store)?;
            let config = HostConfig {
                bind,
                advertise,
                match_config: args.config(Duration::from_secs(countdown_secs))?,
                seed: args.seed,
            };
            multiplayer::host(&store, &profile, config).await
        }
        Commands::Join { code } => {
            let profile = require_profile(&store)?;
            multiplayer::join(&store, &profile, &code).await
        }
    }
}

fn run_profile(store: &ProfileStore, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Create { username } => {
            let profile = store
                .create(&username)
                .with_context(|| format!("could not create profile '{username}'"))?;
            println!("{}", root_racer_core::WELCOME_BANNER);
            terminal::print_profile(&profile);
        }
        ProfileCommand::Show => match store.load()? {
            Some(profile) => terminal::print_profile(&profile),
            None => println!("No profile yet. Create one with `root-racer profile create <name>`."),
        },
        ProfileCommand::Logout => {
            store.clear()?;
            println!("Signed out; profile removed from {}.", store.path().display());
        }
    }
    Ok(())
}

fn require_profile(store: &ProfileStore) -> Result<PlayerProfile> {
    match store.load()? {
        Some(profile) => Ok(profile),
        None => bail!("no profile found; run `root-racer profile create <name>` first"),
    }
}
