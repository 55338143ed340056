use thiserror::Error;

/// Errors raised while configuring agents, environments and experiments
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("starting Q-value must be finite, got {0}")]
    NonFiniteStartingQ(f64),

    #[error("environment must have a finite reward range for UCB learning, got [{min}, {max}]")]
    UnboundedRewardRange { min: f64, max: f64 },

    #[error("starting Q-table has {got} entries, expected {expected}")]
    StartingTableShape { expected: usize, got: usize },

    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("no environment registered under '{0}'")]
    UnknownEnvironment(String),

    #[error("no defaults found for environment '{0}'")]
    MissingDefaults(String),

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
