use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snake_q_learning::config::AppConfig;
use snake_q_learning::persist;
use snake_q_learning::trainer::{RunStats, Trainer};
use snake_q_learning::view::{self, AgentPlayer, HumanPlayer};

#[derive(Parser)]
#[command(name = "snake-q")]
#[command(version, about = "Snake played by a tabular Q-learning agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train headless at full speed and save the table at the end
    Train {
        #[command(flatten)]
        common: Common,

        /// Override number of training episodes
        #[arg(long)]
        episodes: Option<usize>,
    },
    /// Watch the agent play greedily from the saved table (never saved back)
    Play {
        #[command(flatten)]
        common: Common,

        #[arg(long, default_value = "1")]
        episodes: usize,

        /// Run without a window and only log scores
        #[arg(long)]
        headless: bool,
    },
    /// Play yourself with the arrow keys or WASD
    Human {
        /// Path to TOML configuration file
        #[arg(long, default_value = "snake.toml")]
        config: PathBuf,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
struct Common {
    /// Path to TOML configuration file
    #[arg(long, default_value = "snake.toml")]
    config: PathBuf,

    /// Q-table file (.json for JSON, anything else for bincode)
    #[arg(long)]
    table: Option<PathBuf>,

    /// Seed for apple placement and exploration
    #[arg(long)]
    seed: Option<u64>,
}

impl Common {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load_or_default(&self.config)
            .with_context(|| format!("loading config from {}", self.config.display()))?;
        if let Some(table) = &self.table {
            config.training.table_path = table.clone();
        }
        Ok(config)
    }
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train { common, episodes } => {
            let mut config = common.load_config()?;
            if let Some(episodes) = episodes {
                config.training.episodes = episodes;
            }
            config.validate()?;
            train(&config, make_rng(common.seed))
        }
        Command::Play { common, episodes, headless } => {
            let config = common.load_config()?;
            let rng = make_rng(common.seed);
            if headless {
                play_headless(&config, episodes, rng)
            } else {
                let table = persist::load(&config.training.table_path)
                    .with_context(|| format!("loading {}", config.training.table_path.display()))?;
                view::run_window(&config, AgentPlayer::new(&config, table, episodes, rng))
            }
        }
        Command::Human { config, seed } => {
            let config = AppConfig::load_or_default(&config)
                .with_context(|| format!("loading config from {}", config.display()))?;
            view::run_window(&config, HumanPlayer::new(&config.grid, make_rng(seed)))
        }
    }
}

fn train(config: &AppConfig, mut rng: SmallRng) -> Result<()> {
    let path = &config.training.table_path;
    let table = persist::load(path).with_context(|| format!("loading {}", path.display()))?;
    let mut trainer = Trainer::new(config, table);

    info!(episodes = config.training.episodes, "training started");
    let stats = trainer.run(config.training.episodes, &mut rng);
    info!(
        episodes = stats.episodes,
        best = stats.best_score,
        average = format_args!("{:.2}", stats.average()),
        epsilon = stats.epsilon,
        "training finished"
    );

    persist::save(trainer.table(), path).with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

fn play_headless(config: &AppConfig, episodes: usize, mut rng: SmallRng) -> Result<()> {
    let path = &config.training.table_path;
    let table = persist::load(path).with_context(|| format!("loading {}", path.display()))?;
    let mut trainer = Trainer::for_play(config, table);

    let mut stats = RunStats::default();
    for episode in 1..=episodes {
        let summary = trainer.run_episode(0.0, &mut rng);
        stats.record(&summary);
        info!(episode, score = summary.score, steps = summary.steps, "game over");
    }
    info!(
        best = stats.best_score,
        average = format_args!("{:.2}", stats.average()),
        "play finished"
    );
    Ok(())
}
