//! Ground-truth values of tabular models
//!
//! The model is extended with one absorbing, reward-free state that every `done`
//! outcome leads to. Finite horizons are solved by backward induction, infinite ones
//! by policy iteration. Learning agents never consult these results.

use log::debug;

use crate::{
    env::Model,
    error::{Error, Result},
    util,
};

/// Maximum change in a state value at which policy evaluation stops
const EPSILON: f64 = 1e-5;

/// Maximum number of policy iteration rounds
const MAX_ITER: usize = 1000;

/// Number of decisions to optimise for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Finite(usize),
    /// Requires a discount below `1`
    Infinite,
}

/// Optimal values and first-step decisions of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Expected optimal return from the initial state distribution
    pub value: f64,
    /// Optimal value of every state of the model
    pub state_values: Vec<f64>,
    /// An optimal first action for every state of the model
    pub policy: Vec<usize>,
}

/// Expected rewards and merged successor distributions of the augmented model
struct Dynamics {
    actions: usize,
    /// `next[s][a]` lists `(s', p)` with `p` summing to one
    next: Vec<Vec<Vec<(usize, f64)>>>,
    reward: Vec<Vec<f64>>,
}

impl Dynamics {
    fn of<M: Model>(model: &M) -> Self {
        let states = model.num_states();
        let actions = model.num_actions();
        let absorbing = states;

        let mut next = Vec::with_capacity(states + 1);
        let mut reward = Vec::with_capacity(states + 1);
        for s in 0..states {
            let mut next_s = Vec::with_capacity(actions);
            let mut reward_s = Vec::with_capacity(actions);
            for a in 0..actions {
                let outcomes = model.outcomes(s, a);
                let total: f64 = outcomes.iter().map(|o| o.prob).sum();
                if outcomes.is_empty() || total <= 0.0 {
                    // no recorded dynamics, treat as a reward-free self loop
                    next_s.push(vec![(s, 1.0)]);
                    reward_s.push(0.0);
                    continue;
                }

                let mut dist = vec![0.0; states + 1];
                let mut expected = 0.0;
                for o in outcomes {
                    let p = o.prob / total;
                    dist[if o.done { absorbing } else { o.next_state }] += p;
                    expected += p * o.reward;
                }
                next_s.push(
                    dist.into_iter()
                        .enumerate()
                        .filter(|&(_, p)| p > 0.0)
                        .collect(),
                );
                reward_s.push(expected);
            }
            next.push(next_s);
            reward.push(reward_s);
        }
        next.push(vec![vec![(absorbing, 1.0)]; actions]);
        reward.push(vec![0.0; actions]);

        Self {
            actions,
            next,
            reward,
        }
    }

    fn states(&self) -> usize {
        self.next.len()
    }

    fn q_value(&self, s: usize, a: usize, values: &[f64], discount: f64) -> f64 {
        let future: f64 = self.next[s][a].iter().map(|&(n, p)| p * values[n]).sum();
        self.reward[s][a] + discount * future
    }

    fn greedy(&self, s: usize, values: &[f64], discount: f64) -> (usize, f64) {
        let q = (0..self.actions)
            .map(|a| self.q_value(s, a, values, discount))
            .collect::<Vec<_>>();
        let a = util::argmax(&q);
        (a, q[a])
    }

    /// One Bellman optimality sweep
    fn backup(&self, values: &[f64], discount: f64) -> (Vec<f64>, Vec<usize>) {
        (0..self.states())
            .map(|s| {
                let (a, v) = self.greedy(s, values, discount);
                (v, a)
            })
            .unzip()
    }

    fn evaluate(&self, policy: &[usize], values: &mut [f64], discount: f64) {
        let mut delta = f64::INFINITY;
        while delta > EPSILON {
            delta = 0.0;
            for s in 0..self.states() {
                let new_value = self.q_value(s, policy[s], values, discount);
                delta = delta.max((values[s] - new_value).abs());
                values[s] = new_value;
            }
        }
    }

    fn improve(&self, policy: &mut [usize], values: &[f64], discount: f64) -> bool {
        let mut stable = true;
        for s in 0..self.states() {
            let (best, best_value) = self.greedy(s, values, discount);
            let current = self.q_value(s, policy[s], values, discount);
            if best != policy[s] && best_value > current + EPSILON {
                policy[s] = best;
                stable = false;
            }
        }
        stable
    }
}

/// Backward induction over `steps` decisions
fn finite_horizon(dynamics: &Dynamics, discount: f64, steps: usize) -> (Vec<f64>, Vec<usize>) {
    let mut values = vec![0.0; dynamics.states()];
    let mut policy = vec![0; dynamics.states()];
    for _ in 0..steps {
        (values, policy) = dynamics.backup(&values, discount);
    }
    (values, policy)
}

/// Policy iteration with iterative policy evaluation
fn policy_iteration(dynamics: &Dynamics, discount: f64) -> (Vec<f64>, Vec<usize>) {
    let mut values = vec![0.0; dynamics.states()];
    let (_, mut policy) = dynamics.backup(&values, discount);
    for i in 0..MAX_ITER {
        dynamics.evaluate(&policy, &mut values, discount);
        if dynamics.improve(&mut policy, &values, discount) {
            debug!("Policy iteration converged after {} rounds", i + 1);
            break;
        }
    }
    (values, policy)
}

/// Optimal expected return of `model` from its initial state distribution
///
/// **Errors** if the discount is outside `[0,1]`, or is `1` with an infinite horizon
pub fn solve<M: Model>(model: &M, discount: f64, horizon: Horizon) -> Result<Solution> {
    if !(0.0..=1.0).contains(&discount) {
        return Err(Error::invalid(
            "discount",
            format!("must be in the interval [0, 1], got {}", discount),
        ));
    }

    let dynamics = Dynamics::of(model);
    let (mut values, mut policy) = match horizon {
        Horizon::Finite(steps) => finite_horizon(&dynamics, discount, steps),
        Horizon::Infinite if discount < 1.0 => policy_iteration(&dynamics, discount),
        Horizon::Infinite => {
            return Err(Error::invalid(
                "discount",
                "an infinite horizon needs a discount below 1",
            ))
        }
    };

    // drop the absorbing state
    values.truncate(model.num_states());
    policy.truncate(model.num_states());

    let value = values
        .iter()
        .zip(model.initial_distribution())
        .map(|(v, p)| v * p)
        .sum();

    Ok(Solution {
        value,
        state_values: values,
        policy,
    })
}
