//! Tabular reinforcement learning for finite-horizon episodic MDPs.
//!
//! Three agents share one episodic engine with time-indexed Q-tables:
//! epsilon-greedy Q-learning, UCB-H and UCB-H+. An exact solver computes
//! the optimal value of a tabular model so learned values can be checked
//! against ground truth.

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Error types
pub mod error;

/// Multi-trial comparison of agents
pub mod experiment;

/// Exploration policies
pub mod exploration;

/// Exact MDP solutions
pub mod solve;

/// Episode statistics
pub mod stats;

/// Testing environments
#[cfg(feature = "gym")]
pub mod gym;

mod util;

pub use error::{Error, Result};
