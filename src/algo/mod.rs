pub mod tabular;

use crate::stats::{EpisodeStats, Summary};

/// Object-safe surface shared by every episodic agent, so agents of different kinds
/// can be driven side by side
pub trait Agent {
    /// Display name
    fn name(&self) -> &str;

    /// Start the RL loop for `num_episodes` episodes
    ///
    /// **Returns** the rewards of every closed episode so far
    fn run(&mut self, num_episodes: usize) -> &[Vec<f64>];

    /// Rewards of every closed episode, one list per episode
    fn episode_rewards(&self) -> &[Vec<f64>];

    /// Reset the environment, the exploration policy and everything learned
    fn reset_environment(&mut self);

    /// Stats of every closed episode
    fn stats(&self) -> Vec<EpisodeStats>;

    /// Stats of a single closed episode
    fn episode_stats(&self, episode: usize) -> Option<EpisodeStats>;

    /// Mean ± standard error of the episode stats
    fn summary(&self) -> Summary {
        Summary::of(&self.stats())
    }

    /// Greedy action per state at the most recently completed time step
    fn learned_policy(&self) -> Vec<usize>;

    /// Index of the most recently completed step of the current episode
    fn current_step(&self) -> Option<usize>;
}
