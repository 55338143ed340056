use strum::{FromRepr, VariantArray};

use crate::{
    env::Outcome,
    error::{Error, Result},
};

use super::DiscreteEnv;

/// The 4x4 map of the classic frozen lake
pub const MAP_4X4: [&str; 4] = ["SFFF", "FHFH", "FFFH", "HFFG"];

/// The 8x8 map of the classic frozen lake
pub const MAP_8X8: [&str; 8] = [
    "SFFFFFFF", "FFFFFFFF", "FFFHFFFF", "FFFFFHFF", "FFFHFFFF", "FHHFFFHF", "FHFFHFHF", "FFFHFFFG",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Square {
    Frozen,
    Hole,
    Start,
    Goal,
}

impl TryFrom<char> for Square {
    type Error = Error;

    fn try_from(value: char) -> Result<Self> {
        match value {
            'F' => Ok(Self::Frozen),
            'H' => Ok(Self::Hole),
            'S' => Ok(Self::Start),
            'G' => Ok(Self::Goal),
            other => Err(Error::invalid("map", format!("unknown square '{}'", other))),
        }
    }
}

#[derive(FromRepr, VariantArray, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FLAction {
    Left = 0,
    Down = 1,
    Right = 2,
    Up = 3,
}

impl FLAction {
    /// The action a quarter turn away, clockwise for `+1`
    fn turn(self, quarter_turns: i32) -> Self {
        let i = (self as i32 + quarter_turns).rem_euclid(4) as usize;
        Self::from_repr(i).unwrap_or(self)
    }
}

/// Rewards collected when stepping out of a square of each kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rewards {
    pub hole: f64,
    pub goal: f64,
    pub step: f64,
}

impl Default for Rewards {
    fn default() -> Self {
        Self {
            hole: 0.0,
            goal: 1.0,
            step: 0.0,
        }
    }
}

/// A slippery grid world with holes, taken from Python [gymnasium](https://gymnasium.farama.org/)
/// and made adjustable
///
/// The agent moves in the intended direction with probability `p_follow` and slides to
/// either perpendicular direction with the remaining probability split evenly. Rewards
/// depend on the square being left: stepping out of the goal pays the goal reward and
/// ends the episode, holes pay the hole reward and end the episode if
/// `terminate_in_holes` is set, and every other square pays the step reward.
///
/// Builds a [`DiscreteEnv`] with one state per square and the four [`FLAction`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenLake {
    map: Vec<Vec<Square>>,
    p_follow: f64,
    rewards: Rewards,
    terminate_in_holes: bool,
    horizon: usize,
}

impl FrozenLake {
    /// The deterministic 8x8 lake with default rewards and a horizon of 1000 steps
    pub fn new() -> Self {
        Self::from_rows(&MAP_8X8).unwrap_or_else(|_| unreachable!("built-in map is valid"))
    }

    /// A lake from rows of `S` (start), `F` (frozen), `H` (hole) and `G` (goal)
    ///
    /// **Errors** if the rows are empty, ragged, contain other characters or no start
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let map = rows
            .iter()
            .map(|row| row.as_ref().chars().map(Square::try_from).collect())
            .collect::<Result<Vec<Vec<_>>>>()?;

        let ncol = map.first().map_or(0, Vec::len);
        if ncol == 0 || map.iter().any(|row| row.len() != ncol) {
            return Err(Error::invalid("map", "rows must be non-empty and of equal length"));
        }
        if !map.iter().flatten().any(|&sq| sq == Square::Start) {
            return Err(Error::invalid("map", "no start square"));
        }

        Ok(Self {
            map,
            p_follow: 1.0,
            rewards: Rewards::default(),
            terminate_in_holes: true,
            horizon: 1000,
        })
    }

    /// Probability of moving in the intended direction
    ///
    /// **Panics** if `p_follow` is not in the interval `[0,1]`
    pub fn p_follow(mut self, p_follow: f64) -> Self {
        crate::assert_interval!(p_follow, 0.0, 1.0);
        self.p_follow = p_follow;
        self
    }

    pub fn rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn terminate_in_holes(mut self, terminate: bool) -> Self {
        self.terminate_in_holes = terminate;
        self
    }

    /// Maximum number of steps per episode
    pub fn horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    fn nrow(&self) -> usize {
        self.map.len()
    }

    fn ncol(&self) -> usize {
        self.map[0].len()
    }

    fn destination(&self, row: usize, col: usize, action: FLAction) -> usize {
        let (row, col) = match action {
            FLAction::Left => (row, col.saturating_sub(1)),
            FLAction::Down => ((row + 1).min(self.nrow() - 1), col),
            FLAction::Right => (row, (col + 1).min(self.ncol() - 1)),
            FLAction::Up => (row.saturating_sub(1), col),
        };
        row * self.ncol() + col
    }

    fn outcomes(&self, row: usize, col: usize, action: FLAction) -> Vec<Outcome> {
        let s = row * self.ncol() + col;
        let (reward, done) = match self.map[row][col] {
            Square::Hole => (self.rewards.hole, self.terminate_in_holes),
            Square::Goal => (self.rewards.goal, true),
            Square::Frozen | Square::Start => (self.rewards.step, false),
        };
        let outcome = |prob, next_state| Outcome {
            prob,
            next_state,
            reward,
            done,
        };

        match self.map[row][col] {
            Square::Hole | Square::Goal => vec![outcome(1.0, s)],
            _ if self.p_follow < 1.0 => {
                let p_drift = (1.0 - self.p_follow) / 2.0;
                vec![
                    outcome(p_drift, self.destination(row, col, action.turn(-1))),
                    outcome(self.p_follow, self.destination(row, col, action)),
                    outcome(p_drift, self.destination(row, col, action.turn(1))),
                ]
            }
            _ => vec![outcome(1.0, self.destination(row, col, action))],
        }
    }

    /// Build the environment
    pub fn build(&self) -> Result<DiscreteEnv> {
        let transitions: Vec<Vec<Vec<Outcome>>> = (0..self.nrow())
            .flat_map(|row| (0..self.ncol()).map(move |col| (row, col)))
            .map(|(row, col)| {
                FLAction::VARIANTS
                    .iter()
                    .map(|&a| self.outcomes(row, col, a))
                    .collect()
            })
            .collect();

        let starts = self.map.iter().flatten().filter(|&&sq| sq == Square::Start).count();
        let isd = self
            .map
            .iter()
            .flatten()
            .map(|&sq| if sq == Square::Start { 1.0 / starts as f64 } else { 0.0 })
            .collect();

        let Rewards { hole, goal, step } = self.rewards;
        let reward_range = (hole.min(goal).min(step), hole.max(goal).max(step));

        Ok(DiscreteEnv::new(transitions, isd, self.horizon)?.with_reward_range(reward_range))
    }
}

impl Default for FrozenLake {
    fn default() -> Self {
        Self::new()
    }
}
