use log::{debug, info};

use crate::{
    algo::Agent,
    env::{Environment, Info},
    error::{Error, Result},
    exploration::Policy,
    stats::{self, EpisodeStats, Summary},
};

use super::{LearningRule, QTable, StartingQ, VisitCounts};

/// Immutable size parameters of an environment, fixed for a whole run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor {
    pub states: usize,
    pub actions: usize,
    pub horizon: usize,
    pub reward_range: (f64, f64),
}

impl Descriptor {
    pub fn of<E: Environment>(env: &E) -> Self {
        Self {
            states: env.num_states(),
            actions: env.num_actions(),
            horizon: env.horizon(),
            reward_range: env.reward_range(),
        }
    }

    /// The reward range, required to be bounded on both sides
    pub fn bounded_reward_range(&self) -> Result<(f64, f64)> {
        let (min, max) = self.reward_range;
        if min.is_finite() && max.is_finite() {
            Ok((min, max))
        } else {
            Err(Error::UnboundedRewardRange { min, max })
        }
    }

    /// `max - min` of the reward range
    pub fn reward_width(&self) -> f64 {
        self.reward_range.1 - self.reward_range.0
    }
}

/// Parameters of the learning engine shared by every learning rule
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Discount factor γ in `[0,1]`
    pub discount: f64,
    /// Whether a `done` signal marks the successor as absorbing
    pub detect_terminals: bool,
    pub starting_q: StartingQ,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discount: 1.0,
            detect_terminals: true,
            starting_q: StartingQ::default(),
        }
    }
}

/// One observed step of an episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Time step `h` at which the action was taken
    pub step: usize,
    pub state: usize,
    pub action: usize,
    pub next_state: usize,
    pub reward: f64,
    pub done: bool,
    pub info: Info,
}

/// The finite-horizon sense-act-learn loop
///
/// ### Generics
/// - `E` - The [`Environment`] in which the agent will learn
/// - `P` - The exploration [`Policy`] choosing actions from the Q-table
/// - `L` - The [`LearningRule`] updating the Q-table after every step
///
/// The agent owns its environment, its time-indexed Q-table, its visit counts and the
/// reward log, so independent agents never share mutable state.
#[derive(Debug, Clone)]
pub struct EpisodicAgent<E, P, L> {
    name: String,
    env: E,
    policy: P,
    rule: L,
    descriptor: Descriptor,
    discount: f64,
    detect_terminals: bool,
    q: QTable,
    visits: VisitCounts,
    episode_rewards: Vec<Vec<f64>>,
    elapsed: usize,
}

impl<E, P, L> EpisodicAgent<E, P, L>
where
    E: Environment,
    P: Policy,
    L: LearningRule,
{
    /// Assemble an agent and reset its environment and policy
    ///
    /// **Errors** if the discount is outside `[0,1]` or the starting Q-values are not finite
    pub fn new(
        name: impl Into<String>,
        mut env: E,
        mut policy: P,
        rule: L,
        settings: Settings,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.discount) {
            return Err(Error::invalid(
                "discount",
                format!("must be in the interval [0, 1], got {}", settings.discount),
            ));
        }

        let descriptor = Descriptor::of(&env);
        let Descriptor {
            states,
            actions,
            horizon,
            ..
        } = descriptor;
        let q = QTable::new(horizon, states, actions, settings.starting_q)?;

        env.reset();
        policy.reset();

        Ok(Self {
            name: name.into(),
            env,
            policy,
            rule,
            descriptor,
            discount: settings.discount,
            detect_terminals: settings.detect_terminals,
            q,
            visits: VisitCounts::new(horizon, states, actions),
            episode_rewards: vec![vec![]],
            elapsed: 0,
        })
    }

    /// Run `num_episodes` episodes, learning after every step
    ///
    /// **Returns** the rewards of every closed episode so far
    pub fn run(&mut self, num_episodes: usize) -> &[Vec<f64>] {
        info!("Agent {} started learning.", self.name);

        for _ in 0..num_episodes {
            self.run_episode();
        }

        info!(
            "Agent {} finished learning. Trial stats (mean ± standard error): {}",
            self.name,
            self.summary()
        );
        self.closed_episodes()
    }

    fn run_episode(&mut self) {
        let mut state = self.env.reset();
        self.elapsed = 0;

        while self.elapsed < self.descriptor.horizon {
            let step = self.elapsed;
            let action = self.policy.choose(step, state, &self.q);
            self.visits.increment(step, state, action);

            let outcome = self.env.step(action);
            self.elapsed += 1;

            self.learn(&Transition {
                step,
                state,
                action,
                next_state: outcome.next_state,
                reward: outcome.reward,
                done: outcome.done,
                info: outcome.info,
            });
            self.in_progress().push(outcome.reward);

            state = outcome.next_state;
            if outcome.done {
                break;
            }
        }

        self.close_episode();
    }

    /// Apply the learning rule to a transition whose visit is already counted
    fn learn(&mut self, transition: &Transition) {
        let &Transition {
            step,
            state,
            action,
            next_state,
            reward,
            done,
            ..
        } = transition;

        // the environment says (next_state, step + 1) is absorbing
        let next_value = if done && self.detect_terminals {
            self.q.zero_row(step + 1, next_state);
            0.0
        } else {
            self.rule.successor_value(self.q.max(step + 1, next_state))
        };

        let visits = self.visits.get(step, state, action);
        let alpha = self.rule.step_size(visits);
        let bonus = self.rule.bonus(step, visits);
        let td = reward + self.discount * next_value + bonus - self.q.get(step, state, action);
        self.q.add(step, state, action, alpha * td);
    }

    fn in_progress(&mut self) -> &mut Vec<f64> {
        self.episode_rewards
            .last_mut()
            .expect("The reward log always holds an open episode")
    }

    fn close_episode(&mut self) {
        let episode = self.episode_rewards.len() - 1;
        let stats = EpisodeStats::new(episode, &self.episode_rewards[episode], self.discount);
        debug!(
            "End of episode #{}. total reward: {:4.2}, discounted total reward: {:4.2}, length: {}",
            episode, stats.total_reward, stats.discounted_total_reward, stats.episode_length
        );

        self.policy.update();
        self.episode_rewards.push(vec![]);
    }

    /// Reset the environment and the policy, restore the starting Q-values, zero the
    /// visit counts and clear the reward log
    pub fn reset_environment(&mut self) {
        self.env.reset();
        self.policy.reset();
        self.q.reset();
        self.visits.reset();
        self.episode_rewards = vec![vec![]];
        self.elapsed = 0;
    }

    /// Index of the most recently completed step of the current episode
    pub fn current_step(&self) -> Option<usize> {
        self.elapsed.checked_sub(1)
    }

    /// Greedy action per state at time step `step`
    pub fn learned_policy_at(&self, step: usize) -> Vec<usize> {
        (0..self.descriptor.states)
            .map(|s| self.q.greedy_action(step, s))
            .collect()
    }

    /// Greedy action per state at the current time step, or the first time step if
    /// no step has been taken yet
    pub fn learned_policy(&self) -> Vec<usize> {
        self.learned_policy_at(self.current_step().unwrap_or(0))
    }
}

impl<E, P, L> EpisodicAgent<E, P, L> {
    /// Rewards of every closed episode
    pub fn closed_episodes(&self) -> &[Vec<f64>] {
        &self.episode_rewards[..self.episode_rewards.len() - 1]
    }

    /// The full reward log, ending with the open (possibly empty) episode
    pub fn reward_log(&self) -> &[Vec<f64>] {
        &self.episode_rewards
    }

    pub fn stats(&self) -> Vec<EpisodeStats> {
        stats::collect(self.closed_episodes(), self.discount)
    }

    pub fn episode_stats(&self, episode: usize) -> Option<EpisodeStats> {
        self.closed_episodes()
            .get(episode)
            .map(|rewards| EpisodeStats::new(episode, rewards, self.discount))
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.stats())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn q_table(&self) -> &QTable {
        &self.q
    }

    pub fn visit_counts(&self) -> &VisitCounts {
        &self.visits
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn rule(&self) -> &L {
        &self.rule
    }
}

impl<E, P, L> Agent for EpisodicAgent<E, P, L>
where
    E: Environment,
    P: Policy,
    L: LearningRule,
{
    fn name(&self) -> &str {
        EpisodicAgent::name(self)
    }

    fn run(&mut self, num_episodes: usize) -> &[Vec<f64>] {
        EpisodicAgent::run(self, num_episodes)
    }

    fn episode_rewards(&self) -> &[Vec<f64>] {
        self.closed_episodes()
    }

    fn reset_environment(&mut self) {
        EpisodicAgent::reset_environment(self)
    }

    fn stats(&self) -> Vec<EpisodeStats> {
        EpisodicAgent::stats(self)
    }

    fn episode_stats(&self, episode: usize) -> Option<EpisodeStats> {
        EpisodicAgent::episode_stats(self, episode)
    }

    fn learned_policy(&self) -> Vec<usize> {
        EpisodicAgent::learned_policy(self)
    }

    fn current_step(&self) -> Option<usize> {
        EpisodicAgent::current_step(self)
    }
}
