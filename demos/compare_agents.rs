use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use episodic_rl::{
    experiment::{self, ExperimentConfig},
    gym::Registry,
    stats::{fetch_stat, Estimate, Stat},
};
use log::LevelFilter;

/// Run UCB-H+, UCB-H and Q-learning agents in a registered environment
#[derive(Parser, Debug)]
struct Args {
    /// Environment name, e.g. Lake-v0 or Replacement-v0
    env: String,

    /// File of per-environment defaults
    #[arg(long, default_value = "defaults.yml")]
    defaults: PathBuf,

    #[arg(long)]
    trials: Option<usize>,
    /// Number of episodes K
    #[arg(long)]
    episodes: Option<usize>,
    /// Number of steps H
    #[arg(long)]
    steps: Option<usize>,
    #[arg(long)]
    discount: Option<f64>,
    /// Starting Q-value for Q-learning
    #[arg(long)]
    starting_q: Option<f64>,
    #[arg(long)]
    exploration_rate: Option<f64>,
    #[arg(long)]
    exploration_rate_decay: Option<f64>,
    #[arg(long)]
    min_exploration_rate: Option<f64>,
    /// PAC failure probability for UCB-H and UCB-H+
    #[arg(long)]
    delta: Option<f64>,
    /// Bonus multiplier for UCB-H and UCB-H+
    #[arg(long)]
    c: Option<f64>,
    #[arg(long)]
    lambda: Option<f64>,
    #[arg(long)]
    omega: Option<f64>,

    /// Write every episode record to this CSV file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> ExperimentConfig {
        ExperimentConfig {
            trials: self.trials,
            episodes: self.episodes,
            steps: self.steps,
            discount: self.discount,
            starting_q: self.starting_q,
            exploration_rate: self.exploration_rate,
            exploration_rate_decay: self.exploration_rate_decay,
            min_exploration_rate: self.min_exploration_rate,
            delta: self.delta,
            c: self.c,
            lambda: self.lambda,
            omega: self.omega,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let defaults = match fs::read_to_string(&args.defaults) {
        Ok(text) => ExperimentConfig::from_yaml(&text, &args.env)?,
        Err(_) => ExperimentConfig::default(),
    };
    let config = defaults.merge(args.overrides());

    let outcome = experiment::run_named(&Registry::standard(), &args.env, &config)?;

    let episodes = outcome.records.iter().map(|r| r.episode + 1).max().unwrap_or(0);
    let trials = outcome.records.iter().map(|r| r.trial + 1).max().unwrap_or(0);
    println!("{}: optimal value {:.4}", args.env, outcome.solution.value);
    for (method, runs) in fetch_stat(&outcome.records, Stat::DiscountedTotalReward, episodes, trials) {
        let last = runs.iter().filter_map(|run| run.last().copied()).collect::<Vec<_>>();
        println!("  {:<10} final episode: {}", method, Estimate::of(&last));
    }

    if let Some(path) = args.output {
        let mut writer = csv::Writer::from_path(&path)?;
        for record in &outcome.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        println!("Records written to {}", path.display());
    }

    Ok(())
}
