use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, WeightedIndex};

use crate::{
    env::{Environment, Info, Model, Outcome, Step},
    error::{Error, Result},
};

/// A tabular environment defined by its transition lists `P[s][a]`
///
/// Every `(s, a)` pair holds a list of [`Outcome`]s that is sampled in proportion to
/// the outcome probabilities. Episodes start in a state drawn from the initial
/// distribution.
#[derive(Debug, Clone)]
pub struct DiscreteEnv {
    transitions: Vec<Vec<Vec<Outcome>>>,
    samplers: Vec<Vec<WeightedIndex<f64>>>,
    isd: Vec<f64>,
    start: WeightedIndex<f64>,
    reward_range: (f64, f64),
    horizon: usize,
    state: usize,
    last_action: Option<usize>,
    rng: StdRng,
}

impl DiscreteEnv {
    /// Build an environment from `P[s][a]` and an initial state distribution
    ///
    /// The reward range spans the rewards of all listed outcomes.
    ///
    /// **Errors** if the state or action space is empty, an outcome points outside the
    /// state space, or a distribution has no positive weight
    pub fn new(transitions: Vec<Vec<Vec<Outcome>>>, isd: Vec<f64>, horizon: usize) -> Result<Self> {
        let states = transitions.len();
        let actions = transitions.first().map_or(0, Vec::len);
        if states == 0 || actions == 0 {
            return Err(Error::invalid("transitions", "state and action spaces must not be empty"));
        }
        if isd.len() != states {
            return Err(Error::invalid(
                "isd",
                format!("expected {} initial probabilities, got {}", states, isd.len()),
            ));
        }

        let mut samplers = Vec::with_capacity(states);
        for (s, row) in transitions.iter().enumerate() {
            if row.len() != actions {
                return Err(Error::invalid(
                    "transitions",
                    format!("state {} has {} actions, expected {}", s, row.len(), actions),
                ));
            }
            let mut row_samplers = Vec::with_capacity(actions);
            for (a, outcomes) in row.iter().enumerate() {
                if let Some(o) = outcomes.iter().find(|o| o.next_state >= states) {
                    return Err(Error::invalid(
                        "transitions",
                        format!("({}, {}) leads to unknown state {}", s, a, o.next_state),
                    ));
                }
                let sampler = WeightedIndex::new(outcomes.iter().map(|o| o.prob)).map_err(|e| {
                    Error::invalid("transitions", format!("bad distribution at ({}, {}): {}", s, a, e))
                })?;
                row_samplers.push(sampler);
            }
            samplers.push(row_samplers);
        }

        let start = WeightedIndex::new(&isd)
            .map_err(|e| Error::invalid("isd", format!("bad initial distribution: {}", e)))?;

        let reward_range = transitions
            .iter()
            .flatten()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                (lo.min(o.reward), hi.max(o.reward))
            });

        Ok(Self {
            transitions,
            samplers,
            isd,
            start,
            reward_range,
            horizon,
            state: 0,
            last_action: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reseed the random number generator for reproducible episodes
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Override the maximum number of steps per episode
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Override the advertised reward range
    pub fn with_reward_range(mut self, reward_range: (f64, f64)) -> Self {
        self.reward_range = reward_range;
        self
    }

    /// Current state
    pub fn state(&self) -> usize {
        self.state
    }

    /// Action taken in the most recent step, if any since the last reset
    pub fn last_action(&self) -> Option<usize> {
        self.last_action
    }
}

impl Environment for DiscreteEnv {
    fn num_states(&self) -> usize {
        self.transitions.len()
    }

    fn num_actions(&self) -> usize {
        self.transitions[0].len()
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn reward_range(&self) -> (f64, f64) {
        self.reward_range
    }

    fn step(&mut self, action: usize) -> Step {
        assert!(action < Environment::num_actions(self), "Invalid action: {}", action);
        let i = self.samplers[self.state][action].sample(&mut self.rng);
        let outcome = self.transitions[self.state][action][i];

        self.state = outcome.next_state;
        self.last_action = Some(action);
        Step {
            next_state: outcome.next_state,
            reward: outcome.reward,
            done: outcome.done,
            info: Info { prob: outcome.prob },
        }
    }

    fn reset(&mut self) -> usize {
        self.state = self.start.sample(&mut self.rng);
        self.last_action = None;
        self.state
    }
}

impl Model for DiscreteEnv {
    fn num_states(&self) -> usize {
        self.transitions.len()
    }

    fn num_actions(&self) -> usize {
        self.transitions[0].len()
    }

    fn outcomes(&self, state: usize, action: usize) -> &[Outcome] {
        &self.transitions[state][action]
    }

    fn initial_distribution(&self) -> &[f64] {
        &self.isd
    }
}
