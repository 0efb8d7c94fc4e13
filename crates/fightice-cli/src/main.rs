//! fightice-env-cli: random-policy smoke runner
//!
//! Starts a session against a FightingICE install and plays episodes of
//! uniformly random actions against a builtin opponent.
//!
//! Usage: fightice-env-cli <install-root> [port] [episodes]

use anyhow::{Context, Result, bail};
use fightice_core::{ACTION_NAMES, StepStatus};
use fightice_env::{EnvConfig, Opponent, SessionSupervisor};
use rand::Rng;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Builtin opponent the game provides out of the box
const DEFAULT_OPPONENT: &str = "MctsAi";

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: fightice-env-cli <install-root> [port] [episodes]");
    }

    let mut config = EnvConfig::new(&args[1]);
    if let Some(port) = args.get(2) {
        config.port = Some(port.parse().context("port must be a number")?);
    }
    let episodes: u32 = match args.get(3) {
        Some(n) => n.parse().context("episodes must be a number")?,
        None => 3,
    };

    let mut session = SessionSupervisor::new(config)?;
    let opponent = Opponent::builtin(DEFAULT_OPPONENT);
    let mut rng = rand::thread_rng();

    info!(
        port = session.port(),
        episodes, "starting random-policy run"
    );

    for episode in 0..episodes {
        let _obs = session.reset(&opponent)?;
        let mut total_reward = 0.0;
        let mut steps = 0u32;

        loop {
            let action = rng.gen_range(0..ACTION_NAMES.len());
            let outcome = session.step(action)?;
            total_reward += outcome.reward;
            steps += 1;

            match outcome.status {
                StepStatus::Continuing => continue,
                StepStatus::Terminated => {
                    info!(episode, steps, total_reward, "episode finished");
                    break;
                }
                StepStatus::SessionCrashed => {
                    warn!(episode, steps, "game crashed mid-episode; resetting");
                    break;
                }
            }
        }
    }

    session.close();
    Ok(())
}
