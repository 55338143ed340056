//! Finite-horizon tabular learners
//!
//! Every agent is an [`EpisodicAgent`] built from an environment, an exploration
//! [`Policy`](crate::exploration::Policy) and a [`LearningRule`]. The rules differ
//! only in how they bootstrap the successor value, the step size α(t) and the
//! optimism bonus added to the temporal-difference target.

pub mod episodic;
pub mod q_learning;
pub mod table;
pub mod ucb_h;
pub mod ucb_h_plus;

pub use super::Agent;
pub use episodic::{Descriptor, EpisodicAgent, Transition};
pub use q_learning::{QLearning, QLearningAgent, QLearningConfig};
pub use table::{QTable, StartingQ, VisitCounts};
pub use ucb_h::{UcbH, UcbHAgent, UcbHConfig};
pub use ucb_h_plus::{UcbHPlus, UcbHPlusAgent, UcbHPlusConfig};

/// A per-step value update strategy
///
/// The engine computes
///
/// Q<sub>h</sub>(s,a) ← Q<sub>h</sub>(s,a) + α(t)[r + γV<sub>h+1</sub>(s') + b<sub>h</sub>(t) - Q<sub>h</sub>(s,a)]
///
/// where `t` is the visit count of `(h, s, a)` including the current visit.
pub trait LearningRule {
    /// Value-to-go of the successor given its greedy value `max_a Q[h+1][s'][a]`
    fn successor_value(&self, greedy_next: f64) -> f64 {
        greedy_next
    }

    /// Step size α(t)
    ///
    /// **Panics** if `visits` is zero
    fn step_size(&self, visits: u32) -> f64;

    /// Optimism bonus b<sub>h</sub>(t)
    ///
    /// **Panics** if `visits` is zero
    fn bonus(&self, _step: usize, visits: u32) -> f64 {
        assert_visited(visits);
        0.0
    }
}

/// Step size schedule α(t) of Q-learning and UCB-H
#[derive(Debug, Clone, Copy, Default)]
pub enum LearningRate {
    /// α(t) = (H + 1) / (H + t)
    #[default]
    Horizon,
    /// Any function of the visit count
    Custom(fn(u32) -> f64),
}

impl LearningRate {
    pub fn evaluate(&self, horizon: usize, visits: u32) -> f64 {
        assert_visited(visits);
        match self {
            Self::Horizon => (horizon as f64 + 1.0) / (horizon as f64 + visits as f64),
            Self::Custom(alpha_fn) => alpha_fn(visits),
        }
    }
}

pub(crate) fn assert_visited(visits: u32) {
    assert!(
        visits > 0,
        "Step size and bonus are only defined for visited state-action pairs"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_learning_rate() {
        let alpha = LearningRate::Horizon;
        assert_eq!(alpha.evaluate(4, 1), 1.0, "First visit overwrites the estimate");
        assert_eq!(alpha.evaluate(4, 6), 0.5);
        assert_eq!(LearningRate::Custom(|n| 1.0 / n as f64).evaluate(4, 4), 0.25);
    }

    #[test]
    #[should_panic(expected = "visited")]
    fn unvisited_learning_rate_panics() {
        LearningRate::Horizon.evaluate(4, 0);
    }
}
