use crate::{
    env::Outcome,
    error::{Error, Result},
};

use super::DiscreteEnv;

/// Yearly data of a machine by age: `[cost, trade-in value, operating cost, survival probability]`
pub const DEFAULT_DATA: [[f64; 4]; 41] = [
    [2000.0, 1600.0, 50.0, 1.000],
    [1840.0, 1460.0, 53.0, 0.999],
    [1680.0, 1340.0, 56.0, 0.998],
    [1560.0, 1230.0, 59.0, 0.997],
    [1300.0, 1050.0, 62.0, 0.996],
    [1220.0, 980.0, 65.0, 0.994],
    [1150.0, 910.0, 68.0, 0.991],
    [1080.0, 840.0, 71.0, 0.988],
    [900.0, 710.0, 75.0, 0.985],
    [840.0, 650.0, 78.0, 0.983],
    [780.0, 600.0, 81.0, 0.980],
    [730.0, 550.0, 84.0, 0.975],
    [600.0, 480.0, 87.0, 0.970],
    [560.0, 430.0, 90.0, 0.965],
    [520.0, 390.0, 93.0, 0.960],
    [480.0, 360.0, 96.0, 0.955],
    [440.0, 330.0, 100.0, 0.950],
    [420.0, 310.0, 103.0, 0.945],
    [400.0, 290.0, 106.0, 0.940],
    [380.0, 270.0, 109.0, 0.935],
    [360.0, 255.0, 112.0, 0.930],
    [345.0, 240.0, 115.0, 0.925],
    [330.0, 225.0, 118.0, 0.919],
    [315.0, 210.0, 121.0, 0.910],
    [300.0, 200.0, 125.0, 0.900],
    [290.0, 190.0, 129.0, 0.890],
    [280.0, 180.0, 133.0, 0.880],
    [265.0, 170.0, 137.0, 0.865],
    [250.0, 160.0, 141.0, 0.850],
    [240.0, 150.0, 145.0, 0.820],
    [230.0, 145.0, 150.0, 0.790],
    [220.0, 140.0, 155.0, 0.760],
    [210.0, 135.0, 160.0, 0.730],
    [200.0, 130.0, 167.0, 0.660],
    [190.0, 120.0, 175.0, 0.590],
    [180.0, 115.0, 182.0, 0.510],
    [170.0, 110.0, 190.0, 0.430],
    [160.0, 105.0, 205.0, 0.300],
    [150.0, 95.0, 220.0, 0.200],
    [140.0, 87.0, 235.0, 0.100],
    [130.0, 80.0, 250.0, 0.000],
];

const MAX_AGE: usize = DEFAULT_DATA.len() - 1;

/// Per-age values of one quantity of the replacement problem
#[derive(Debug, Clone, Default)]
pub enum Schedule {
    /// A column of [`DEFAULT_DATA`], subsampled evenly when fewer ages are used
    #[default]
    Table,
    Constant(f64),
    /// Explicit values per age, truncated to the number of ages
    Values(Vec<f64>),
    /// A function of the relative age in `[0, 1]`
    Function(fn(f64) -> f64),
}

impl Schedule {
    fn to_values(&self, length: usize, column: usize) -> Vec<f64> {
        match self {
            Self::Table => {
                let by = MAX_AGE / (length - 1);
                std::iter::once(DEFAULT_DATA[0][column])
                    .chain((1..=MAX_AGE / by).map(|k| DEFAULT_DATA[k * by][column]))
                    .collect()
            }
            Self::Constant(x) => vec![*x; length],
            Self::Values(values) => values.iter().copied().take(length).collect(),
            Self::Function(f) => (0..length)
                .map(|i| f(i as f64 / (length - 1) as f64))
                .collect(),
        }
    }
}

/// Machine replacement as a finite MDP
///
/// The state is the age of the machine. Each year the owner either keeps the machine,
/// paying its operating cost, or trades it in for one of age `a - 1` with action `a ≥ 1`.
/// A machine of the chosen age survives the year with its survival probability and
/// otherwise breaks down into the oldest state. Rewards are negative costs.
///
/// Builds a [`DiscreteEnv`] with `n` states and `n + 1` actions that always starts
/// with a new machine.
#[derive(Debug, Clone)]
pub struct Replacement {
    states: usize,
    cost: Schedule,
    trade_in: Schedule,
    op_cost: Schedule,
    survival: Schedule,
    horizon: usize,
}

impl Replacement {
    /// The full 40-year problem on [`DEFAULT_DATA`] over a 40-year horizon
    pub fn new() -> Self {
        Self {
            states: MAX_AGE,
            cost: Schedule::Table,
            trade_in: Schedule::Table,
            op_cost: Schedule::Table,
            survival: Schedule::Table,
            horizon: 40,
        }
    }

    /// Number of ages, capped at 40 when any schedule reads [`DEFAULT_DATA`]
    pub fn states(mut self, states: usize) -> Self {
        self.states = states;
        self
    }

    /// Price of a machine by age
    pub fn cost(mut self, schedule: Schedule) -> Self {
        self.cost = schedule;
        self
    }

    /// Value received when trading in a machine by age
    pub fn trade_in(mut self, schedule: Schedule) -> Self {
        self.trade_in = schedule;
        self
    }

    /// Yearly cost of operating a machine by age
    pub fn op_cost(mut self, schedule: Schedule) -> Self {
        self.op_cost = schedule;
        self
    }

    /// Probability that a machine of a given age survives the year
    pub fn survival(mut self, schedule: Schedule) -> Self {
        self.survival = schedule;
        self
    }

    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Build the environment
    ///
    /// **Errors** if fewer than one age remains or a survival probability is outside `[0, 1]`
    pub fn build(&self) -> Result<DiscreteEnv> {
        let schedules = [&self.cost, &self.trade_in, &self.op_cost, &self.survival];
        let mut states = self.states;
        if schedules.iter().any(|s| matches!(s, Schedule::Table)) {
            states = states.min(MAX_AGE);
        }
        if states == 0 {
            return Err(Error::invalid("states", "at least one age is required"));
        }

        let [c, t, e, p] = [0, 1, 2, 3].map(|column| schedules[column].to_values(states + 1, column));
        let states = [&c, &t, &e, &p].iter().map(|v| v.len()).min().unwrap_or(0);
        let Some(states) = states.checked_sub(1).filter(|&n| n > 0) else {
            return Err(Error::invalid("states", "schedules must cover at least two ages"));
        };
        if let Some(bad) = p.iter().find(|x| !(0.0..=1.0).contains(*x)) {
            return Err(Error::invalid(
                "survival",
                format!("probabilities must be in [0, 1], got {}", bad),
            ));
        }

        let last = states - 1;
        let survive_or_break = |prob: f64, next_state: usize, reward: f64| {
            let mut outcomes = Vec::with_capacity(2);
            if prob > 0.0 {
                outcomes.push(Outcome {
                    prob,
                    next_state,
                    reward,
                    done: false,
                });
            }
            if prob < 1.0 {
                outcomes.push(Outcome {
                    prob: 1.0 - prob,
                    next_state: last,
                    reward,
                    done: false,
                });
            }
            outcomes
        };

        let transitions: Vec<Vec<Vec<Outcome>>> = (0..states)
            .map(|s| {
                let keep = survive_or_break(p[s + 1], (s + 1).min(last), -e[s + 1]);
                let replace = (1..=states).map(|a| {
                    let age = a - 1;
                    survive_or_break(p[age], age, -e[age] + t[s + 1] - c[age])
                });
                std::iter::once(keep).chain(replace).collect()
            })
            .collect();

        let mut isd = vec![0.0; states];
        isd[0] = 1.0;
        DiscreteEnv::new(transitions, isd, self.horizon)
    }
}

impl Default for Replacement {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::{Environment, Model},
        solve::{solve, Horizon},
    };

    #[test]
    fn replacement_functional() {
        let env = Replacement::new().build().unwrap();
        assert_eq!(Environment::num_states(&env), 40);
        assert_eq!(Environment::num_actions(&env), 41);
        assert_eq!(env.horizon(), 40);
        assert_eq!(env.initial_distribution()[0], 1.0);

        // keeping a new machine
        let keep = env.outcomes(0, 0);
        assert_eq!(keep.len(), 2);
        assert_eq!((keep[0].prob, keep[0].next_state, keep[0].reward), (0.999, 1, -53.0));
        assert_eq!(keep[1].next_state, 39);
        assert!((keep[1].prob - 0.001).abs() < 1e-12);

        // trading a new machine for another new one never breaks down
        let replace = env.outcomes(0, 1);
        assert_eq!(replace.len(), 1);
        assert_eq!(replace[0].reward, -50.0 + 1460.0 - 2000.0);
    }

    #[test]
    fn fewer_ages_subsample_the_table() {
        let env = Replacement::new().states(10).build().unwrap();
        assert_eq!(Environment::num_states(&env), 10);
        assert_eq!(Environment::num_actions(&env), 11);
        // every fourth year of the table
        assert_eq!(env.outcomes(0, 0)[0].reward, -62.0);
        assert_eq!(env.outcomes(1, 0)[0].reward, -75.0);

        let env = Replacement::new().states(100).build().unwrap();
        assert_eq!(Environment::num_states(&env), 40);
    }

    #[test]
    fn custom_schedules() {
        let env = Replacement::new()
            .states(3)
            .cost(Schedule::Constant(10.0))
            .trade_in(Schedule::Values(vec![5.0; 8]))
            .op_cost(Schedule::Function(|x| 1.0 + x))
            .survival(Schedule::Constant(0.5))
            .build()
            .unwrap();
        assert_eq!(Environment::num_states(&env), 3);

        let keep = env.outcomes(0, 0);
        assert_eq!(keep.len(), 2);
        assert_eq!((keep[0].next_state, keep[1].next_state), (1, 2));
        assert!((keep[0].reward + 4.0 / 3.0).abs() < 1e-12);

        let replace = env.outcomes(1, 2);
        assert_eq!((replace[0].next_state, replace[1].next_state), (1, 2));
        assert!((replace[0].reward - (-(1.0 + 1.0 / 3.0) + 5.0 - 10.0)).abs() < 1e-12);
    }

    #[test]
    fn short_schedules_limit_the_state_space() {
        let env = Replacement::new()
            .states(5)
            .cost(Schedule::Values(vec![10.0, 9.0, 8.0]))
            .build()
            .unwrap();
        assert_eq!(Environment::num_states(&env), 2);
        assert!(Replacement::new().states(0).build().is_err());
        assert!(Replacement::new()
            .survival(Schedule::Constant(1.5))
            .build()
            .is_err());
    }

    #[test]
    fn oldest_machine_is_replaced() {
        let env = Replacement::new().build().unwrap();
        let solution = solve(&env, 1.0, Horizon::Finite(40)).unwrap();
        assert!(solution.value < 0.0);
        assert_ne!(solution.policy[39], 0, "A machine that cannot survive is traded in");
    }
}
