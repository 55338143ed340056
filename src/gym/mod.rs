pub mod discrete;
pub mod frozen_lake;
pub mod registry;
pub mod replacement;

pub use discrete::DiscreteEnv;
pub use frozen_lake::FrozenLake;
pub use registry::Registry;
pub use replacement::Replacement;
