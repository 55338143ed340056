use crate::{
    decay::{Decay, Geometric},
    env::Environment,
    error::Result,
    exploration::EpsilonGreedy,
};

use super::{
    episodic::{EpisodicAgent, Settings},
    LearningRate, LearningRule, StartingQ,
};

/// Configuration for the [`QLearningAgent`]
#[derive(Debug, Clone)]
pub struct QLearningConfig {
    /// Discount factor
    ///
    /// **Default**: `1.0`
    pub discount: f64,
    /// Initial Q-values, must be finite
    ///
    /// **Default**: `0.0`
    pub starting_q: StartingQ,
    /// Treat `done` as the end of the value-to-go
    ///
    /// **Default**: `true`
    pub detect_terminals: bool,
    /// Step size α(t) given the number of visits of `(h, s, a)`
    ///
    /// **Default**: [`LearningRate::Horizon`]
    pub learning_rate: LearningRate,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            discount: 1.0,
            starting_q: StartingQ::Uniform(0.0),
            detect_terminals: true,
            learning_rate: LearningRate::Horizon,
        }
    }
}

/// Plain episodic Q-learning
///
/// Q<sub>h</sub>(s,a) ← Q<sub>h</sub>(s,a) + α(t)[r + γ max<sub>a'</sub> Q<sub>h+1</sub>(s',a') - Q<sub>h</sub>(s,a)]
#[derive(Debug, Clone, Copy)]
pub struct QLearning {
    horizon: usize,
    learning_rate: LearningRate,
}

impl QLearning {
    pub fn new(horizon: usize, learning_rate: LearningRate) -> Self {
        Self {
            horizon,
            learning_rate,
        }
    }
}

impl LearningRule for QLearning {
    fn step_size(&self, visits: u32) -> f64 {
        self.learning_rate.evaluate(self.horizon, visits)
    }
}

/// An epsilon-greedy Q-learning agent with a time-indexed Q-table
pub type QLearningAgent<E, D = Geometric> = EpisodicAgent<E, EpsilonGreedy<D>, QLearning>;

impl<E: Environment, D: Decay> EpisodicAgent<E, EpsilonGreedy<D>, QLearning> {
    /// Initialize a new Q-learning agent in a given environment
    ///
    /// **Errors** if the discount is outside `[0,1]` or a starting Q-value is not finite
    pub fn q_learning(
        name: impl Into<String>,
        env: E,
        exploration: EpsilonGreedy<D>,
        config: QLearningConfig,
    ) -> Result<Self> {
        let rule = QLearning::new(env.horizon(), config.learning_rate);
        let settings = Settings {
            discount: config.discount,
            detect_terminals: config.detect_terminals,
            starting_q: config.starting_q,
        };
        Self::new(name, env, exploration, rule, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decay::Constant, env::tests::MockEnv, error::Error};

    #[test]
    fn no_bonus_and_identity_successor() {
        let rule = QLearning::new(3, LearningRate::Horizon);
        assert_eq!(rule.successor_value(42.0), 42.0);
        assert_eq!(rule.bonus(0, 1), 0.0);
        assert_eq!(rule.step_size(1), 1.0);
        assert_eq!(rule.step_size(5), 0.5);
    }

    #[test]
    fn rejects_non_finite_starting_q() {
        let config = QLearningConfig {
            starting_q: StartingQ::Uniform(f64::NAN),
            ..Default::default()
        };
        let exploration = EpsilonGreedy::new(Constant::new(0.1));
        assert!(matches!(
            EpisodicAgent::q_learning("q", MockEnv::new(2, 2, 2), exploration, config),
            Err(Error::NonFiniteStartingQ(_))
        ));
    }

    #[test]
    fn learns_discounted_chain_values() {
        // a greedy agent moving forward along a 4-state chain: Q_h = Σ γ^k over the
        // remaining forward moves
        let config = QLearningConfig {
            discount: 0.5,
            ..Default::default()
        };
        let exploration = EpsilonGreedy::with_seed(Constant::new(0.0), 1);
        let mut agent =
            EpisodicAgent::q_learning("q", MockEnv::new(4, 1, 3), exploration, config).unwrap();
        agent.run(200);

        let q = agent.q_table();
        assert!((q.get(2, 2, 0) - 1.0).abs() < 1e-9);
        assert!((q.get(1, 1, 0) - 1.5).abs() < 1e-2);
        assert!((q.get(0, 0, 0) - 1.75).abs() < 1e-2);
        assert_eq!(agent.summary().discounted_total_reward.mean, 1.75);
    }
}
