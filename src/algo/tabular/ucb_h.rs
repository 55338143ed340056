use crate::{
    env::Environment,
    error::{Error, Result},
    exploration::Greedy,
};

use super::{
    assert_visited,
    episodic::{Descriptor, EpisodicAgent, Settings},
    LearningRate, LearningRule, StartingQ,
};

/// Configuration for the [`UcbHAgent`]
#[derive(Debug, Clone)]
pub struct UcbHConfig {
    /// Discount factor
    ///
    /// **Default**: `1.0`
    pub discount: f64,
    /// Treat `done` as the end of the value-to-go
    ///
    /// **Default**: `true`
    pub detect_terminals: bool,
    /// PAC failure probability δ
    ///
    /// **Default**: `0.001`
    pub delta: f64,
    /// Multiplier `c` of the exploration bonus
    ///
    /// **Default**: `0.001`
    pub c: f64,
    /// Number of episodes K the agent is planned to run, used for the confidence term
    ///
    /// **Default**: `10000`
    pub num_episodes: usize,
    /// Step size α(t) given the number of visits of `(h, s, a)`
    ///
    /// **Default**: [`LearningRate::Horizon`]
    pub learning_rate: LearningRate,
}

impl Default for UcbHConfig {
    fn default() -> Self {
        Self {
            discount: 1.0,
            detect_terminals: true,
            delta: 0.001,
            c: 0.001,
            num_episodes: 10000,
            learning_rate: LearningRate::Horizon,
        }
    }
}

/// ι = ln(S·A·H·K / δ)
pub(crate) fn log_confidence(descriptor: &Descriptor, delta: f64, num_episodes: usize) -> Result<f64> {
    if !(delta > 0.0 && delta <= 1.0) {
        return Err(Error::invalid("delta", format!("must be in (0, 1], got {}", delta)));
    }
    if num_episodes == 0 {
        return Err(Error::invalid("num_episodes", "must be positive"));
    }
    let &Descriptor {
        states,
        actions,
        horizon,
        ..
    } = descriptor;
    let size = states as f64 * actions as f64 * horizon as f64 * num_episodes as f64;
    Ok((size / delta).ln())
}

/// Optimistic initial value `max_reward × H`
pub(crate) fn optimistic_start(descriptor: &Descriptor) -> Result<f64> {
    let (_, max) = descriptor.bounded_reward_range()?;
    Ok(max * descriptor.horizon as f64)
}

pub(crate) fn validate_c(c: f64) -> Result<()> {
    (c.is_finite() && c >= 0.0)
        .then_some(())
        .ok_or_else(|| Error::invalid("c", format!("must be finite and non-negative, got {}", c)))
}

/// Q-learning with a Hoeffding upper confidence bound (UCB-H)
///
/// The bonus b(t) = c·(r<sub>max</sub> - r<sub>min</sub>)·√(8Hι/t) shrinks with the visit
/// count. Successor values are capped at the optimistic starting value so optimism
/// does not compound across time steps.
#[derive(Debug, Clone, Copy)]
pub struct UcbH {
    horizon: usize,
    c: f64,
    iota: f64,
    reward_width: f64,
    starting_q: f64,
    learning_rate: LearningRate,
}

impl UcbH {
    /// **Errors** if the reward range is unbounded or a PAC parameter is out of range
    pub fn new(descriptor: &Descriptor, config: &UcbHConfig) -> Result<Self> {
        validate_c(config.c)?;
        Ok(Self {
            horizon: descriptor.horizon,
            c: config.c,
            iota: log_confidence(descriptor, config.delta, config.num_episodes)?,
            reward_width: descriptor.reward_width(),
            starting_q: optimistic_start(descriptor)?,
            learning_rate: config.learning_rate,
        })
    }

    /// The confidence term ι
    pub fn iota(&self) -> f64 {
        self.iota
    }

    /// Optimistic initial Q-value, also the cap on successor values
    pub fn starting_q(&self) -> f64 {
        self.starting_q
    }
}

impl LearningRule for UcbH {
    fn successor_value(&self, greedy_next: f64) -> f64 {
        greedy_next.min(self.starting_q)
    }

    fn step_size(&self, visits: u32) -> f64 {
        self.learning_rate.evaluate(self.horizon, visits)
    }

    fn bonus(&self, _step: usize, visits: u32) -> f64 {
        assert_visited(visits);
        let h = self.horizon as f64;
        self.c * self.reward_width * (8.0 * h * self.iota / visits as f64).sqrt()
    }
}

/// A UCB-H agent acting greedily on its optimistic Q-table
pub type UcbHAgent<E> = EpisodicAgent<E, Greedy, UcbH>;

impl<E: Environment> EpisodicAgent<E, Greedy, UcbH> {
    /// Initialize a new UCB-H agent in a given environment
    ///
    /// **Errors** if the environment's reward range is unbounded
    pub fn ucb_h(name: impl Into<String>, env: E, config: UcbHConfig) -> Result<Self> {
        let rule = UcbH::new(&Descriptor::of(&env), &config)?;
        let settings = Settings {
            discount: config.discount,
            detect_terminals: config.detect_terminals,
            starting_q: StartingQ::Uniform(rule.starting_q()),
        };
        Self::new(name, env, Greedy, rule, settings)
    }
}
