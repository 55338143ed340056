use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::{DiscreteEnv, FrozenLake, Replacement};

/// Creates a fresh environment on every call
pub type Factory = Box<dyn Fn() -> Result<DiscreteEnv> + Send + Sync>;

/// Named environment factories
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard environments
    ///
    /// - `Lake-v0`: the deterministic 8x8 [`FrozenLake`] with a horizon of 16 steps
    /// - `Replacement-v0`: the full [`Replacement`] problem over 40 years
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("Lake-v0", || {
            FrozenLake::new().p_follow(1.0).horizon(16).build()
        });
        registry.register("Replacement-v0", || Replacement::new().horizon(40).build());
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<DiscreteEnv> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// **Errors** if nothing is registered under `name`, or the factory fails
    pub fn make(&self, name: &str) -> Result<DiscreteEnv> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_owned()))?;
        factory()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;

    #[test]
    fn standard_environments() {
        let registry = Registry::standard();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Lake-v0", "Replacement-v0"]);

        let lake = registry.make("Lake-v0").unwrap();
        assert_eq!((lake.num_states(), lake.num_actions(), lake.horizon()), (64, 4, 16));

        let replacement = registry.make("Replacement-v0").unwrap();
        assert_eq!(replacement.num_actions(), 41);
        assert_eq!(replacement.horizon(), 40);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            Registry::standard().make("CartPole-v1"),
            Err(Error::UnknownEnvironment(name)) if name == "CartPole-v1"
        ));
    }

    #[test]
    fn custom_factories() {
        let mut registry = Registry::new();
        assert!(!registry.contains("Tiny-v0"));
        registry.register("Tiny-v0", || {
            FrozenLake::from_rows(&["SG"])?.horizon(2).build()
        });
        let env = registry.make("Tiny-v0").unwrap();
        assert_eq!(env.num_states(), 2);
    }
}
