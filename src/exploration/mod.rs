use crate::algo::tabular::QTable;

/// Exploration policy result
pub enum Choice {
    Explore,
    Exploit,
}

/// Action selection over a time-indexed Q-table
///
/// Policies only read the table. They are told when an episode ends so decaying
/// hyperparameters can advance, and are reset together with the environment.
pub trait Policy {
    /// Choose an action for `state` at time step `step`
    fn choose(&mut self, step: usize, state: usize, q: &QTable) -> usize;

    /// Advance per-episode state
    fn update(&mut self) {}

    /// Return to the initial configuration
    fn reset(&mut self) {}
}

mod epsilon_greedy;
mod greedy;

pub use epsilon_greedy::EpsilonGreedy;
pub use greedy::Greedy;
