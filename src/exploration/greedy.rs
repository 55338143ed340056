use crate::algo::tabular::QTable;

use super::Policy;

/// Always picks the first action with the highest value
///
/// Used by the upper confidence bound learners, whose optimism bonus is already part
/// of the Q-values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl Policy for Greedy {
    fn choose(&mut self, step: usize, state: usize, q: &QTable) -> usize {
        q.greedy_action(step, state)
    }
}
