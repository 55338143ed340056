use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    algo::{
        tabular::{EpisodicAgent, QLearningConfig, StartingQ, UcbHConfig, UcbHPlusConfig},
        Agent,
    },
    env::{Environment, Model, TimeLimit},
    error::{Error, Result},
    exploration::EpsilonGreedy,
    solve::{solve, Horizon, Solution},
    stats::Record,
};

/// Parameters of a comparison run
///
/// Every field is optional so partial configurations can be layered with
/// [`merge`](ExperimentConfig::merge). Missing values fall back to the documented
/// defaults when the experiment runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of independent trials
    ///
    /// **Default**: `1`
    pub trials: Option<usize>,
    /// Number of episodes K per trial
    ///
    /// **Default**: `10000`
    pub episodes: Option<usize>,
    /// Number of steps H per episode
    ///
    /// **Default**: the environment's horizon
    pub steps: Option<usize>,
    /// **Default**: `1.0`
    pub discount: Option<f64>,
    /// Initial Q-values of the Q-learning agent
    ///
    /// **Default**: `max_reward / (1 - discount)` for `discount < 1`, `max_reward × steps` otherwise
    pub starting_q: Option<f64>,
    /// Initial exploration rate of the Q-learning agent
    ///
    /// **Default**: `1.0`
    pub exploration_rate: Option<f64>,
    /// Factor applied to the exploration rate after every episode
    ///
    /// **Default**: `0.99`
    pub exploration_rate_decay: Option<f64>,
    /// **Default**: `0.0`
    pub min_exploration_rate: Option<f64>,
    /// PAC failure probability of the UCB agents
    ///
    /// **Default**: `0.001`
    pub delta: Option<f64>,
    /// Bonus multiplier of the UCB agents
    ///
    /// **Default**: `0.0`
    pub c: Option<f64>,
    /// Step size coefficient λ of UCB-H+
    ///
    /// **Default**: `1.0`
    #[serde(alias = "lamb")]
    pub lambda: Option<f64>,
    /// Step size power ω of UCB-H+
    ///
    /// **Default**: `0.8`
    pub omega: Option<f64>,
}

impl ExperimentConfig {
    /// Read the section for `env_name` from a defaults document keyed by environment name
    ///
    /// **Errors** if the document is malformed or has no such section
    pub fn from_yaml(text: &str, env_name: &str) -> Result<Self> {
        let mut sections: BTreeMap<String, Self> = serde_yaml::from_str(text)?;
        sections
            .remove(env_name)
            .ok_or_else(|| Error::MissingDefaults(env_name.to_owned()))
    }

    /// Layer `overrides` on top of `self`, keeping values `overrides` leaves unset
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            trials: overrides.trials.or(self.trials),
            episodes: overrides.episodes.or(self.episodes),
            steps: overrides.steps.or(self.steps),
            discount: overrides.discount.or(self.discount),
            starting_q: overrides.starting_q.or(self.starting_q),
            exploration_rate: overrides.exploration_rate.or(self.exploration_rate),
            exploration_rate_decay: overrides
                .exploration_rate_decay
                .or(self.exploration_rate_decay),
            min_exploration_rate: overrides.min_exploration_rate.or(self.min_exploration_rate),
            delta: overrides.delta.or(self.delta),
            c: overrides.c.or(self.c),
            lambda: overrides.lambda.or(self.lambda),
            omega: overrides.omega.or(self.omega),
        }
    }

    fn resolve<E: Environment>(&self, env: &E) -> Plan {
        let steps = self.steps.unwrap_or_else(|| env.horizon());
        let discount = self.discount.unwrap_or(1.0);
        let starting_q = self.starting_q.unwrap_or_else(|| {
            let (_, max_reward) = env.reward_range();
            if discount < 1.0 {
                max_reward / (1.0 - discount)
            } else {
                max_reward * steps as f64
            }
        });
        Plan {
            trials: self.trials.unwrap_or(1),
            episodes: self.episodes.unwrap_or(10000),
            steps,
            discount,
            starting_q,
            exploration_rate: self.exploration_rate.unwrap_or(1.0),
            exploration_rate_decay: self.exploration_rate_decay.unwrap_or(0.99),
            min_exploration_rate: self.min_exploration_rate.unwrap_or(0.0),
            delta: self.delta.unwrap_or(0.001),
            c: self.c.unwrap_or(0.0),
            lambda: self.lambda.unwrap_or(1.0),
            omega: self.omega.unwrap_or(0.8),
        }
    }
}

/// A fully resolved [`ExperimentConfig`]
#[derive(Debug, Clone, Copy)]
struct Plan {
    trials: usize,
    episodes: usize,
    steps: usize,
    discount: f64,
    starting_q: f64,
    exploration_rate: f64,
    exploration_rate_decay: f64,
    min_exploration_rate: f64,
    delta: f64,
    c: f64,
    lambda: f64,
    omega: f64,
}

/// Everything an experiment produced
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Stats of every episode of every agent and trial, in run order
    pub records: Vec<Record>,
    /// Exact solution over the experiment's horizon
    pub solution: Solution,
}

/// The three competing agents, in the order they run
fn agents<E>(env: &TimeLimit<E>, plan: &Plan) -> Result<Vec<Box<dyn Agent>>>
where
    E: Environment + Clone + 'static,
{
    let ucb_h_plus = UcbHPlusConfig {
        discount: plan.discount,
        delta: plan.delta,
        c: plan.c,
        num_episodes: plan.episodes,
        lambda: plan.lambda,
        omega: plan.omega,
        ..Default::default()
    };
    let ucb_h = UcbHConfig {
        discount: plan.discount,
        delta: plan.delta,
        c: plan.c,
        num_episodes: plan.episodes,
        ..Default::default()
    };
    let q_learning = QLearningConfig {
        discount: plan.discount,
        starting_q: StartingQ::Uniform(plan.starting_q),
        ..Default::default()
    };
    let exploration = EpsilonGreedy::geometric(
        plan.exploration_rate,
        plan.exploration_rate_decay,
        plan.min_exploration_rate,
    )?;

    let agents: Vec<Box<dyn Agent>> = vec![
        Box::new(EpisodicAgent::ucb_h_plus("QUCBPlus", env.clone(), ucb_h_plus)?),
        Box::new(EpisodicAgent::ucb_h("QUCB", env.clone(), ucb_h)?),
        Box::new(EpisodicAgent::q_learning("Q_max", env.clone(), exploration, q_learning)?),
    ];
    Ok(agents)
}

/// Compare UCB-H+, UCB-H and epsilon-greedy Q-learning on `env`
///
/// Every trial resets each agent and runs it for the configured number of episodes.
/// The exact solution over the same horizon is computed once up front.
///
/// **Errors** if the environment's reward range is unbounded or a parameter is invalid
pub fn run<E>(env: E, config: &ExperimentConfig) -> Result<Outcome>
where
    E: Environment + Model + Clone + 'static,
{
    let plan = config.resolve(&env);
    let env = TimeLimit::new(env, plan.steps);
    let mut agents = agents(&env, &plan)?;

    let solution = solve(&env, plan.discount, Horizon::Finite(plan.steps))?;
    info!("Value: {}", solution.value);

    let mut records = Vec::with_capacity(plan.trials * agents.len() * plan.episodes);
    for trial in 0..plan.trials {
        info!("Starting trial #{}", trial);
        for agent in agents.iter_mut() {
            agent.reset_environment();
            agent.run(plan.episodes);
            records.extend(
                agent
                    .stats()
                    .into_iter()
                    .map(|stats| Record::new(agent.name(), trial, stats)),
            );
        }
        info!("Trial #{} done", trial);
    }

    Ok(Outcome { records, solution })
}

/// Run an experiment on an environment from `registry`
///
/// **Errors** if `name` is not registered, or as [`run`]
#[cfg(feature = "gym")]
pub fn run_named(
    registry: &crate::gym::Registry,
    name: &str,
    config: &ExperimentConfig,
) -> Result<Outcome> {
    let env = registry.make(name)?;
    info!("Starting environment {}", name);
    run(env, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: &str = "
Lake-v0:
  trials: 2
  episodes: 500
  discount: 1.0
  c: 0.001
  lamb: 2.0
Other-v0:
  steps: 7
";

    #[test]
    fn defaults_by_environment() {
        let config = ExperimentConfig::from_yaml(DEFAULTS, "Lake-v0").unwrap();
        assert_eq!(config.trials, Some(2));
        assert_eq!(config.episodes, Some(500));
        assert_eq!(config.lambda, Some(2.0), "Accepts the short key");
        assert_eq!(config.steps, None);

        assert!(matches!(
            ExperimentConfig::from_yaml(DEFAULTS, "Missing-v0"),
            Err(Error::MissingDefaults(name)) if name == "Missing-v0"
        ));
        assert!(matches!(
            ExperimentConfig::from_yaml("Lake-v0: [1, 2", "Lake-v0"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn overrides_win() {
        let defaults = ExperimentConfig::from_yaml(DEFAULTS, "Lake-v0").unwrap();
        let merged = defaults.merge(ExperimentConfig {
            episodes: Some(20),
            omega: Some(0.5),
            ..Default::default()
        });
        assert_eq!(merged.episodes, Some(20));
        assert_eq!(merged.omega, Some(0.5));
        assert_eq!(merged.trials, Some(2), "Unset overrides keep the defaults");
    }

    #[test]
    fn starting_q_is_inferred() {
        let env = crate::env::tests::MockEnv::new(3, 2, 4);
        let plan = ExperimentConfig::default().resolve(&env);
        assert_eq!((plan.steps, plan.starting_q), (4, 4.0));

        let config = ExperimentConfig {
            discount: Some(0.5),
            ..Default::default()
        };
        assert_eq!(config.resolve(&env).starting_q, 2.0);

        let config = ExperimentConfig {
            starting_q: Some(-1.0),
            steps: Some(10),
            ..Default::default()
        };
        let plan = config.resolve(&env);
        assert_eq!((plan.steps, plan.starting_q), (10, -1.0));
        assert_eq!((plan.trials, plan.episodes), (1, 10000));
    }

    #[cfg(feature = "gym")]
    mod gym {
        use super::*;
        use crate::{
            gym::{frozen_lake::MAP_4X4, FrozenLake, Registry},
            stats::{fetch_stat, Stat},
        };

        fn config() -> ExperimentConfig {
            ExperimentConfig {
                trials: Some(2),
                episodes: Some(30),
                steps: Some(8),
                ..Default::default()
            }
        }

        #[test]
        fn records_every_agent_trial_and_episode() {
            let env = FrozenLake::from_rows(&MAP_4X4).unwrap().build().unwrap();
            let outcome = run(env, &config()).unwrap();
            assert_eq!(outcome.solution.value, 1.0);
            assert_eq!(outcome.records.len(), 2 * 3 * 30);

            let methods = outcome.records[..90]
                .chunks(30)
                .map(|chunk| chunk[0].method.as_str())
                .collect::<Vec<_>>();
            assert_eq!(methods, vec!["QUCBPlus", "QUCB", "Q_max"]);
            assert!(outcome.records[90..].iter().all(|r| r.trial == 1));
            assert!(outcome.records.iter().all(|r| r.episode_length <= 8));

            let totals = fetch_stat(&outcome.records, Stat::TotalReward, 30, 2);
            assert_eq!(totals.len(), 3);
            assert!(totals.values().flatten().flatten().all(|r| *r == 0.0 || *r == 1.0));
        }

        #[test]
        fn named_environments() {
            let registry = Registry::standard();
            let config = ExperimentConfig {
                episodes: Some(5),
                ..Default::default()
            };
            let outcome = run_named(&registry, "Lake-v0", &config).unwrap();
            assert_eq!(outcome.records.len(), 15);
            assert!(outcome.records.iter().all(|r| r.episode_length <= 16));

            assert!(matches!(
                run_named(&registry, "Nope-v0", &config),
                Err(Error::UnknownEnvironment(_))
            ));
        }

        #[test]
        fn invalid_exploration_rates_are_errors() {
            let lake = || FrozenLake::from_rows(&MAP_4X4).unwrap().build().unwrap();
            let too_high = ExperimentConfig {
                exploration_rate: Some(1.5),
                ..config()
            };
            assert!(matches!(
                run(lake(), &too_high),
                Err(Error::InvalidParameter { name: "exploration_rate", .. })
            ));

            let negative = ExperimentConfig {
                min_exploration_rate: Some(-0.5),
                ..config()
            };
            assert!(matches!(
                run(lake(), &negative),
                Err(Error::InvalidParameter { name: "min_exploration_rate", .. })
            ));
        }
    }
}
