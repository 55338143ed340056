use crate::{
    error::{Error, Result},
    util,
};

/// Initial contents of a [`QTable`]
#[derive(Debug, Clone, PartialEq)]
pub enum StartingQ {
    /// The same value for every `(h, s, a)`
    Uniform(f64),
    /// One value per `(s, a)`, laid out state-major, repeated for every time step
    PerStateAction(Vec<f64>),
}

impl StartingQ {
    /// Largest configured starting value
    pub fn max(&self) -> f64 {
        match self {
            Self::Uniform(q) => *q,
            Self::PerStateAction(values) => util::max(values),
        }
    }
}

impl Default for StartingQ {
    fn default() -> Self {
        Self::Uniform(0.0)
    }
}

impl From<f64> for StartingQ {
    fn from(value: f64) -> Self {
        Self::Uniform(value)
    }
}

/// Time-indexed action-value table `Q[h][s][a]` for `h` in `0..=H`
///
/// The terminal row `h = H` is always zero. Only the learning engine may write to
/// the table; exploration policies see it through a shared reference.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    horizon: usize,
    states: usize,
    actions: usize,
    values: Vec<f64>,
    start: StartingQ,
}

impl QTable {
    /// Allocate a table for `horizon` steps filled with the starting values
    ///
    /// **Errors** if the state or action space is empty, any starting value is not
    /// finite, or a per-state-action table does not have `states * actions` entries
    pub fn new(horizon: usize, states: usize, actions: usize, start: StartingQ) -> Result<Self> {
        if states == 0 || actions == 0 {
            return Err(Error::invalid(
                "states",
                format!("need at least one state and one action, got {} x {}", states, actions),
            ));
        }
        match &start {
            StartingQ::Uniform(q) if !q.is_finite() => return Err(Error::NonFiniteStartingQ(*q)),
            StartingQ::PerStateAction(values) => {
                if values.len() != states * actions {
                    return Err(Error::StartingTableShape {
                        expected: states * actions,
                        got: values.len(),
                    });
                }
                if let Some(&q) = values.iter().find(|q| !q.is_finite()) {
                    return Err(Error::NonFiniteStartingQ(q));
                }
            }
            _ => {}
        }

        let mut table = Self {
            horizon,
            states,
            actions,
            values: vec![0.0; (horizon + 1) * states * actions],
            start,
        };
        table.reset();
        Ok(table)
    }

    /// Restore every entry to its starting value and zero the terminal row
    pub(crate) fn reset(&mut self) {
        let layer = self.states * self.actions;
        let (live, terminal) = self.values.split_at_mut(self.horizon * layer);
        match &self.start {
            StartingQ::Uniform(q) => live.fill(*q),
            StartingQ::PerStateAction(values) => live
                .chunks_exact_mut(layer)
                .for_each(|step| step.copy_from_slice(values)),
        }
        terminal.fill(0.0);
    }

    fn index(&self, step: usize, state: usize, action: usize) -> usize {
        assert!(step <= self.horizon, "Time step {} beyond horizon {}", step, self.horizon);
        assert!(state < self.states, "Invalid state: {}", state);
        assert!(action < self.actions, "Invalid action: {}", action);
        (step * self.states + state) * self.actions + action
    }

    pub fn get(&self, step: usize, state: usize, action: usize) -> f64 {
        self.values[self.index(step, state, action)]
    }

    pub(crate) fn add(&mut self, step: usize, state: usize, action: usize, delta: f64) {
        debug_assert!(step < self.horizon, "The terminal row is never learned");
        let i = self.index(step, state, action);
        self.values[i] += delta;
    }

    /// Action values of `state` at `step`
    pub fn row(&self, step: usize, state: usize) -> &[f64] {
        let start = self.index(step, state, 0);
        &self.values[start..start + self.actions]
    }

    /// Forget everything learned about `state` at `step`
    pub(crate) fn zero_row(&mut self, step: usize, state: usize) {
        let start = self.index(step, state, 0);
        self.values[start..start + self.actions].fill(0.0);
    }

    /// Greedy value `max_a Q[step][state][a]`
    pub fn max(&self, step: usize, state: usize) -> f64 {
        util::max(self.row(step, state))
    }

    /// First action achieving the greedy value
    pub fn greedy_action(&self, step: usize, state: usize) -> usize {
        util::argmax(self.row(step, state))
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn num_states(&self) -> usize {
        self.states
    }

    pub fn num_actions(&self) -> usize {
        self.actions
    }

    pub fn starting_q(&self) -> &StartingQ {
        &self.start
    }
}

/// Number of times each `(h, s, a)` was taken during the current run, `h` in `0..H`
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCounts {
    states: usize,
    actions: usize,
    counts: Vec<u32>,
}

impl VisitCounts {
    pub fn new(horizon: usize, states: usize, actions: usize) -> Self {
        Self {
            states,
            actions,
            counts: vec![0; horizon * states * actions],
        }
    }

    fn index(&self, step: usize, state: usize, action: usize) -> usize {
        assert!(state < self.states, "Invalid state: {}", state);
        assert!(action < self.actions, "Invalid action: {}", action);
        (step * self.states + state) * self.actions + action
    }

    pub fn get(&self, step: usize, state: usize, action: usize) -> u32 {
        self.counts[self.index(step, state, action)]
    }

    /// Record one more visit and return the new count
    pub(crate) fn increment(&mut self, step: usize, state: usize, action: usize) -> u32 {
        let i = self.index(step, state, action);
        self.counts[i] += 1;
        self.counts[i]
    }

    pub(crate) fn reset(&mut self) {
        self.counts.fill(0);
    }

    /// Total number of recorded visits
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&n| n as u64).sum()
    }
}
