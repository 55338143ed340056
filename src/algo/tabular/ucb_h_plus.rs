use crate::{
    env::Environment,
    error::{Error, Result},
    exploration::Greedy,
};

use super::{
    assert_visited,
    episodic::{Descriptor, EpisodicAgent, Settings},
    ucb_h::{log_confidence, optimistic_start, validate_c},
    LearningRule, StartingQ,
};

/// Configuration for the [`UcbHPlusAgent`]
#[derive(Debug, Clone)]
pub struct UcbHPlusConfig {
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
    /// Additive coefficient λ of the step size, scaled by the horizon
    ///
    /// **Default**: `1.0`
    pub lambda: f64,
    /// Power ω applied to the visit count in the step size
    ///
    /// **Default**: `0.8`
    pub omega: f64,
}

impl Default for UcbHPlusConfig {
    fn default() -> Self {
        Self {
            discount: 1.0,
            detect_terminals: true,
            delta: 0.001,
            c: 0.001,
            num_episodes: 10000,
            lambda: 1.0,
            omega: 0.8,
        }
    }
}

/// UCB-H with a tunable step size schedule and a telescoping bonus (UCB-H+)
///
/// - α(t) = (λH + 1) / (λH + t<sup>ω</sup>)
/// - β(t) = 1 / √((λH + t)<sup>ω</sup>)
/// - b<sub>h</sub>(t) = c·v<sub>h+1</sub>·γ·√ι·[β(t)/α(t) + (1 - 1/α(t))·β(t-1)]
///
/// where v<sub>h+1</sub> bounds the discounted reward still obtainable after step `h`.
#[derive(Debug, Clone, Copy)]
pub struct UcbHPlus {
    horizon: usize,
    c: f64,
    iota: f64,
    reward_width: f64,
    starting_q: f64,
    discount: f64,
    lambda_h: f64,
    omega: f64,
}

impl UcbHPlus {
    /// **Errors** if the reward range is unbounded or a parameter is out of range
    pub fn new(descriptor: &Descriptor, config: &UcbHPlusConfig) -> Result<Self> {
        validate_c(config.c)?;
        if !(config.lambda.is_finite() && config.lambda > 0.0) {
            return Err(Error::invalid("lambda", format!("must be positive, got {}", config.lambda)));
        }
        if !(config.omega.is_finite() && config.omega > 0.0) {
            return Err(Error::invalid("omega", format!("must be positive, got {}", config.omega)));
        }
        Ok(Self {
            horizon: descriptor.horizon,
            c: config.c,
            iota: log_confidence(descriptor, config.delta, config.num_episodes)?,
            reward_width: descriptor.reward_width(),
            starting_q: optimistic_start(descriptor)?,
            discount: config.discount,
            lambda_h: config.lambda * descriptor.horizon as f64,
            omega: config.omega,
        })
    }

    pub fn iota(&self) -> f64 {
        self.iota
    }

    /// Optimistic initial Q-value, also the cap on successor values
    pub fn starting_q(&self) -> f64 {
        self.starting_q
    }

    /// Largest discounted reward range still obtainable after time step `step`
    pub fn value_span(&self, step: usize) -> f64 {
        let remaining = self.horizon as f64 - step as f64 + 1.0;
        if self.discount == 1.0 {
            self.reward_width * remaining
        } else {
            self.reward_width * (1.0 - self.discount.powf(remaining)) / (1.0 - self.discount)
        }
    }

    fn bonus_base(&self, visits: f64) -> f64 {
        1.0 / (self.lambda_h + visits).powf(self.omega).sqrt()
    }
}

impl LearningRule for UcbHPlus {
    fn successor_value(&self, greedy_next: f64) -> f64 {
        greedy_next.min(self.starting_q)
    }

    fn step_size(&self, visits: u32) -> f64 {
        assert_visited(visits);
        (self.lambda_h + 1.0) / (self.lambda_h + (visits as f64).powf(self.omega))
    }

    fn bonus(&self, step: usize, visits: u32) -> f64 {
        let inverse_alpha = 1.0 / self.step_size(visits);
        let t = visits as f64;
        let telescoped =
            inverse_alpha * self.bonus_base(t) + (1.0 - inverse_alpha) * self.bonus_base(t - 1.0);
        telescoped * self.c * self.value_span(step) * self.discount * self.iota.sqrt()
    }
}

/// A UCB-H+ agent acting greedily on its optimistic Q-table
pub type UcbHPlusAgent<E> = EpisodicAgent<E, Greedy, UcbHPlus>;

impl<E: Environment> EpisodicAgent<E, Greedy, UcbHPlus> {
    /// Initialize a new UCB-H+ agent in a given environment
    ///
    /// **Errors** if the environment's reward range is unbounded
    pub fn ucb_h_plus(name: impl Into<String>, env: E, config: UcbHPlusConfig) -> Result<Self> {
        let rule = UcbHPlus::new(&Descriptor::of(&env), &config)?;
        let settings = Settings {
            discount: config.discount,
            detect_terminals: config.detect_terminals,
            starting_q: StartingQ::Uniform(rule.starting_q()),
        };
        Self::new(name, env, Greedy, rule, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::MockEnv;

    fn descriptor() -> Descriptor {
        Descriptor {
            states: 3,
            actions: 2,
            horizon: 5,
            reward_range: (0.0, 2.0),
        }
    }

    #[test]
    fn step_size_schedule() {
        let rule = UcbHPlus::new(&descriptor(), &UcbHPlusConfig::default()).unwrap();
        assert_eq!(rule.step_size(1), 1.0, "First visit overwrites the estimate");

        let expected = 6.0 / (5.0 + 10f64.powf(0.8));
        assert!((rule.step_size(10) - expected).abs() < 1e-12);

        let alphas = (1..100).map(|t| rule.step_size(t)).collect::<Vec<_>>();
        assert!(alphas.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn value_span_closed_form() {
        let rule = UcbHPlus::new(&descriptor(), &UcbHPlusConfig::default()).unwrap();
        assert_eq!(rule.value_span(0), 12.0);
        assert_eq!(rule.value_span(4), 4.0);

        let config = UcbHPlusConfig {
            discount: 0.5,
            ..Default::default()
        };
        let rule = UcbHPlus::new(&descriptor(), &config).unwrap();
        // 2 * (1 + 0.5 + 0.25)
        assert!((rule.value_span(3) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn first_visit_bonus_uses_current_base() {
        let config = UcbHPlusConfig {
            c: 0.1,
            ..Default::default()
        };
        let rule = UcbHPlus::new(&descriptor(), &config).unwrap();
        let expected = 0.1 * 12.0 * rule.iota().sqrt() / 6f64.powf(0.8).sqrt();
        assert!((rule.bonus(0, 1) - expected).abs() < 1e-12);
    }

    #[test]
    fn later_bonus_telescopes_previous_base() {
        let config = UcbHPlusConfig {
            c: 0.1,
            ..Default::default()
        };
        let rule = UcbHPlus::new(&descriptor(), &config).unwrap();

        // λH = 5, ω = 0.8, so β(t) = (5 + t)^-0.4
        let alpha = 6.0 / (5.0 + 2f64.powf(0.8));
        let beta = |t: f64| (5.0 + t).powf(-0.4);
        let scale = 0.1 * 12.0 * rule.iota().sqrt();
        let expected = (beta(2.0) / alpha + (1.0 - 1.0 / alpha) * beta(1.0)) * scale;
        assert!((rule.bonus(0, 2) - expected).abs() < 1e-12);

        let untelescoped = beta(2.0) / alpha + (1.0 - 1.0 / alpha) * beta(2.0);
        assert!(
            (rule.bonus(0, 2) - untelescoped * scale).abs() > 1e-6,
            "Second term uses the previous visit count"
        );
    }

    #[test]
    fn bonus_shrinks_and_vanishes_without_discount() {
        let config = UcbHPlusConfig {
            c: 0.1,
            ..Default::default()
        };
        let rule = UcbHPlus::new(&descriptor(), &config).unwrap();
        assert!(rule.bonus(2, 1000) < rule.bonus(2, 1));

        let config = UcbHPlusConfig {
            c: 0.1,
            discount: 0.0,
            ..Default::default()
        };
        let rule = UcbHPlus::new(&descriptor(), &config).unwrap();
        assert_eq!(rule.bonus(2, 3), 0.0);
    }

    #[test]
    fn rejects_invalid_schedule() {
        let config = UcbHPlusConfig {
            omega: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            UcbHPlus::new(&descriptor(), &config),
            Err(Error::InvalidParameter { name: "omega", .. })
        ));

        let mut env = MockEnv::new(2, 2, 2);
        env.rewards = (0.0, f64::INFINITY);
        assert!(matches!(
            EpisodicAgent::ucb_h_plus("ucb+", env, UcbHPlusConfig::default()),
            Err(Error::UnboundedRewardRange { .. })
        ));
    }

    #[test]
    fn finds_rewarding_action() {
        let config = UcbHPlusConfig {
            c: 0.01,
            num_episodes: 300,
            ..Default::default()
        };
        let mut agent = EpisodicAgent::ucb_h_plus("ucb+", MockEnv::new(4, 3, 3), config).unwrap();
        agent.run(300);
        assert_eq!(agent.episode_stats(299).unwrap().total_reward, 3.0);
    }
}
