/// Side information returned with every environment step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Info {
    /// Probability of the sampled transition
    pub prob: f64,
}

/// The result of a single environment step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub next_state: usize,
    pub reward: f64,
    /// The environment reached an absorbing state
    pub done: bool,
    pub info: Info,
}

/// Represents a finite-horizon Markov decision process, defining the dynamics of an
/// environment in which an episodic agent can operate.
///
/// States are `0..num_states()` and actions are `0..num_actions()`. Every episode
/// lasts at most [`horizon`](Environment::horizon) steps; the agent stops stepping
/// after that many steps even if the environment never signals `done`.
pub trait Environment {
    /// Number of discrete states
    fn num_states(&self) -> usize;

    /// Number of discrete actions, available in every state
    fn num_actions(&self) -> usize;

    /// Maximum number of steps in an episode
    fn horizon(&self) -> usize;

    /// Smallest and largest reward a single step can produce
    fn reward_range(&self) -> (f64, f64);

    /// Update the environment in response to an action taken by an agent
    fn step(&mut self, action: usize) -> Step;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> usize;
}

/// A single entry of a transition distribution `P[s][a]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub prob: f64,
    pub next_state: usize,
    pub reward: f64,
    pub done: bool,
}

/// A fully known tabular model of an environment's dynamics
///
/// Required by the [exact solver](crate::solve), never by the learning agents.
pub trait Model {
    fn num_states(&self) -> usize;

    fn num_actions(&self) -> usize;

    /// All possible outcomes of taking `action` in `state`
    fn outcomes(&self, state: usize, action: usize) -> &[Outcome];

    /// Probability of starting an episode in each state
    fn initial_distribution(&self) -> &[f64];
}

/// Wraps an environment and replaces its horizon
#[derive(Debug, Clone)]
pub struct TimeLimit<E> {
    env: E,
    horizon: usize,
}

impl<E> TimeLimit<E> {
    pub fn new(env: E, horizon: usize) -> Self {
        Self { env, horizon }
    }

    pub fn inner(&self) -> &E {
        &self.env
    }

    pub fn into_inner(self) -> E {
        self.env
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    fn num_states(&self) -> usize {
        self.env.num_states()
    }

    fn num_actions(&self) -> usize {
        self.env.num_actions()
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn reward_range(&self) -> (f64, f64) {
        self.env.reward_range()
    }

    fn step(&mut self, action: usize) -> Step {
        self.env.step(action)
    }

    fn reset(&mut self) -> usize {
        self.env.reset()
    }
}

impl<E: Model> Model for TimeLimit<E> {
    fn num_states(&self) -> usize {
        self.env.num_states()
    }

    fn num_actions(&self) -> usize {
        self.env.num_actions()
    }

    fn outcomes(&self, state: usize, action: usize) -> &[Outcome] {
        self.env.outcomes(state, action)
    }

    fn initial_distribution(&self) -> &[f64] {
        self.env.initial_distribution()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic chain used across the crate's tests
    ///
    /// Action `0` moves one state forward and earns `1.0`; every other action stays
    /// in place and earns nothing. Reaching the last state ends the episode.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        pub states: usize,
        pub actions: usize,
        pub horizon: usize,
        pub rewards: (f64, f64),
        pub state: usize,
        pub resets: usize,
    }

    impl MockEnv {
        pub fn new(states: usize, actions: usize, horizon: usize) -> Self {
            Self {
                states,
                actions,
                horizon,
                rewards: (0.0, 1.0),
                state: 0,
                resets: 0,
            }
        }
    }

    impl Environment for MockEnv {
        fn num_states(&self) -> usize {
            self.states
        }

        fn num_actions(&self) -> usize {
            self.actions
        }

        fn horizon(&self) -> usize {
            self.horizon
        }

        fn reward_range(&self) -> (f64, f64) {
            self.rewards
        }

        fn step(&mut self, action: usize) -> Step {
            assert!(action < self.actions, "Invalid action: {}", action);
            let reward = if action == 0 && self.state + 1 < self.states {
                self.state += 1;
                1.0
            } else {
                0.0
            };
            Step {
                next_state: self.state,
                reward,
                done: self.state + 1 == self.states,
                info: Info { prob: 1.0 },
            }
        }

        fn reset(&mut self) -> usize {
            self.resets += 1;
            self.state = 0;
            self.state
        }
    }

    #[test]
    fn mock_env_functional() {
        let mut env = MockEnv::new(3, 2, 4);
        assert_eq!(env.reset(), 0, "Reset returns the first state");

        let step = env.step(1);
        assert_eq!((step.next_state, step.reward, step.done), (0, 0.0, false));

        let step = env.step(0);
        assert_eq!((step.next_state, step.reward, step.done), (1, 1.0, false));

        let step = env.step(0);
        assert!(step.done, "Last state is terminal");
    }

    #[test]
    fn time_limit_overrides_horizon() {
        let mut env = TimeLimit::new(MockEnv::new(3, 2, 4), 9);
        assert_eq!(env.horizon(), 9);
        assert_eq!(Environment::num_states(&env), 3);
        env.reset();
        assert_eq!(env.step(0).next_state, 1);
        assert_eq!(env.into_inner().resets, 1);
    }
}
