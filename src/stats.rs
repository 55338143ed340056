use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Summary of a single closed episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    pub episode: usize,
    #[serde(rename = "total reward")]
    pub total_reward: f64,
    #[serde(rename = "discounted total reward")]
    pub discounted_total_reward: f64,
    #[serde(rename = "episode length")]
    pub episode_length: usize,
}

impl EpisodeStats {
    pub fn new(episode: usize, rewards: &[f64], discount: f64) -> Self {
        Self {
            episode,
            total_reward: rewards.iter().sum(),
            discounted_total_reward: discounted_sum(rewards, discount),
            episode_length: rewards.len(),
        }
    }
}

/// r<sub>0</sub> + γr<sub>1</sub> + γ<sup>2</sup>r<sub>2</sub> + ..., accumulated from the back
///
/// An empty sequence sums to `0`.
pub fn discounted_sum(rewards: &[f64], discount: f64) -> f64 {
    rewards.iter().rev().fold(0.0, |acc, &r| acc * discount + r)
}

/// Stats for every episode of a reward log, in episode order
pub fn collect(episodes: &[Vec<f64>], discount: f64) -> Vec<EpisodeStats> {
    episodes
        .iter()
        .enumerate()
        .map(|(i, rewards)| EpisodeStats::new(i, rewards, discount))
        .collect()
}

/// Mean and standard error of the mean of a sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Estimate {
    pub mean: f64,
    pub sem: f64,
}

impl Estimate {
    /// An empty sample has mean `0`; fewer than two observations have zero error
    pub fn of(values: &[f64]) -> Self {
        match values.len() {
            0 => Self::default(),
            1 => Self {
                mean: values[0],
                sem: 0.0,
            },
            n => Self {
                mean: values.iter().mean(),
                sem: values.iter().std_dev() / (n as f64).sqrt(),
            },
        }
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4.2} ± {:4.2}", self.mean, self.sem)
    }
}

/// Across-episode aggregate of every numeric [`EpisodeStats`] field except the index
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Summary {
    pub episodes: usize,
    pub total_reward: Estimate,
    pub discounted_total_reward: Estimate,
    pub episode_length: Estimate,
}

impl Summary {
    pub fn of(stats: &[EpisodeStats]) -> Self {
        let field = |f: fn(&EpisodeStats) -> f64| {
            Estimate::of(&stats.iter().map(f).collect::<Vec<_>>())
        };
        Self {
            episodes: stats.len(),
            total_reward: field(|s| s.total_reward),
            discounted_total_reward: field(|s| s.discounted_total_reward),
            episode_length: field(|s| s.episode_length as f64),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total reward: {}, discounted total reward: {}, episode length: {}",
            self.total_reward, self.discounted_total_reward, self.episode_length
        )
    }
}

/// Episode stats tagged with the agent and trial that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub method: String,
    pub trial: usize,
    pub episode: usize,
    #[serde(rename = "total reward")]
    pub total_reward: f64,
    #[serde(rename = "discounted total reward")]
    pub discounted_total_reward: f64,
    #[serde(rename = "episode length")]
    pub episode_length: usize,
}

impl Record {
    pub fn new(method: impl Into<String>, trial: usize, stats: EpisodeStats) -> Self {
        Self {
            method: method.into(),
            trial,
            episode: stats.episode,
            total_reward: stats.total_reward,
            discounted_total_reward: stats.discounted_total_reward,
            episode_length: stats.episode_length,
        }
    }

    pub fn get(&self, stat: Stat) -> f64 {
        match stat {
            Stat::TotalReward => self.total_reward,
            Stat::DiscountedTotalReward => self.discounted_total_reward,
            Stat::EpisodeLength => self.episode_length as f64,
        }
    }
}

/// A numeric field of [`Record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    TotalReward,
    DiscountedTotalReward,
    EpisodeLength,
}

/// Reshape records into one `trials × episodes` matrix of `stat` per method
///
/// Cells with no matching record hold `+∞`; records outside the shape are ignored.
pub fn fetch_stat(
    records: &[Record],
    stat: Stat,
    episodes: usize,
    trials: usize,
) -> BTreeMap<String, Vec<Vec<f64>>> {
    let mut result = BTreeMap::new();
    for record in records {
        let matrix = result
            .entry(record.method.clone())
            .or_insert_with(|| vec![vec![f64::INFINITY; episodes]; trials]);
        if let Some(cell) = matrix
            .get_mut(record.trial)
            .and_then(|row| row.get_mut(record.episode))
        {
            *cell = record.get(stat);
        }
    }
    result
}
