use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    algo::tabular::QTable,
    decay::{Decay, Geometric},
    error::{Error, Result},
    util,
};

use super::{Choice, Policy};

/// Epsilon greedy exploration policy with an epsilon threshold decaying once per episode
///
/// Exploiting breaks ties between equally valued actions uniformly at random.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay = Geometric> {
    epsilon: D,
    episode: u32,
    rng: StdRng,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self {
            epsilon: decay,
            episode: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Initialize with a seeded random number generator for reproducible runs
    pub fn with_seed(decay: D, seed: u64) -> Self {
        Self {
            epsilon: decay,
            episode: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Exploration rate for the current episode
    pub fn epsilon(&self) -> f64 {
        self.epsilon.evaluate(self.episode as f64)
    }

    /// Decide whether the next action explores
    pub fn roll(&mut self) -> Choice {
        if self.rng.gen::<f64>() < self.epsilon() {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}

impl EpsilonGreedy<Geometric> {
    /// Epsilon starts at `start` and is multiplied by `decay` after every episode until
    /// it reaches `min`
    ///
    /// **Errors** if `start` or `min` is not in the interval `[0,1]`, or the decay is invalid
    pub fn geometric(start: f64, decay: f64, min: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&start) {
            return Err(Error::invalid(
                "exploration_rate",
                format!("must be in the interval [0, 1], got {}", start),
            ));
        }
        if !(0.0..=1.0).contains(&min) {
            return Err(Error::invalid(
                "min_exploration_rate",
                format!("must be in the interval [0, 1], got {}", min),
            ));
        }
        Ok(Self::new(Geometric::new(decay, start, min)?))
    }
}

impl<D: Decay> Policy for EpsilonGreedy<D> {
    fn choose(&mut self, step: usize, state: usize, q: &QTable) -> usize {
        match self.roll() {
            Choice::Explore => self.rng.gen_range(0..q.num_actions()),
            Choice::Exploit => *util::argmax_ties(q.row(step, state))
                .choose(&mut self.rng)
                .expect("There is always at least one action available"),
        }
    }

    fn update(&mut self) {
        self.episode += 1;
    }

    fn reset(&mut self) {
        self.episode = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algo::tabular::StartingQ, decay::Constant};

    #[test]
    fn epsilon_decay_is_bounded() {
        let mut policy = EpsilonGreedy::geometric(1.0, 0.9, 0.1).unwrap();
        assert_eq!(policy.epsilon(), 1.0);
        for n in 1..100 {
            policy.update();
            let expected = 0.9f64.powf(n as f64).max(0.1);
            assert_eq!(policy.epsilon(), expected, "Epsilon after {} episodes", n);
            assert!(policy.epsilon() >= 0.1, "Epsilon never drops below its minimum");
        }

        policy.reset();
        assert_eq!(policy.epsilon(), 1.0, "Reset restores the starting rate");
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        assert!(matches!(
            EpsilonGreedy::geometric(1.5, 0.9, 0.0),
            Err(Error::InvalidParameter { name: "exploration_rate", .. })
        ));
        assert!(matches!(
            EpsilonGreedy::geometric(1.0, 0.9, -0.1),
            Err(Error::InvalidParameter { name: "min_exploration_rate", .. })
        ));
        assert!(EpsilonGreedy::geometric(1.0, 1.5, 0.0).is_err(), "Decay above one");
    }

    #[test]
    fn greedy_when_epsilon_is_zero() {
        let mut q = QTable::new(2, 1, 3, StartingQ::Uniform(0.0)).unwrap();
        q.add(1, 0, 2, 1.0);
        let mut policy = EpsilonGreedy::with_seed(Constant::new(0.0), 7);
        for _ in 0..20 {
            assert_eq!(policy.choose(1, 0, &q), 2);
        }
    }

    #[test]
    fn exploit_breaks_ties_among_maxima() {
        let mut q = QTable::new(1, 1, 3, StartingQ::Uniform(0.0)).unwrap();
        q.add(0, 0, 0, 1.0);
        q.add(0, 0, 2, 1.0);
        let mut policy = EpsilonGreedy::with_seed(Constant::new(0.0), 11);
        let choices = (0..200).map(|_| policy.choose(0, 0, &q)).collect::<Vec<_>>();
        assert!(!choices.contains(&1), "Never picks a dominated action");
        assert!(choices.contains(&0) && choices.contains(&2), "Both tied actions chosen");
    }

    #[test]
    fn explores_every_action() {
        let q = QTable::new(1, 1, 4, StartingQ::Uniform(0.0)).unwrap();
        let mut policy = EpsilonGreedy::with_seed(Constant::new(1.0), 3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[policy.choose(0, 0, &q)] = true;
        }
        assert_eq!(seen, [true; 4]);
    }
}
