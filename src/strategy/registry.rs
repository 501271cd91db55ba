//! Name → strategy lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{builtin_strategies, Strategy};
use crate::error::StrategyError;

/// Named strategies available to a simulation.
///
/// Built once at configuration time and shared read-only afterwards.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, Arc<dyn Strategy>>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl StrategyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in strategy.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, strategy) in builtin_strategies() {
            registry.register(name, strategy);
        }
        registry
    }

    /// Add or replace a strategy.
    pub fn register(&mut self, name: impl Into<String>, strategy: Arc<dyn Strategy>) {
        self.strategies.insert(name.into(), strategy);
    }

    /// Look up a strategy by name.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Unknown`] listing every valid name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Strategy>, StrategyError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| StrategyError::Unknown {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Check that a name is registered.
    ///
    /// # Errors
    ///
    /// Same as [`StrategyRegistry::get`].
    pub fn validate(&self, name: &str) -> Result<(), StrategyError> {
        self.get(name).map(|_| ())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyContext;
    use rand::RngCore;

    #[test]
    fn test_builtins_registered() {
        let registry = StrategyRegistry::with_builtins();
        for name in ["all_in", "half", "scrooge", "smart_v1", "random"] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert_eq!(registry.len(), builtin_strategies().len());
    }

    #[test]
    fn test_unknown_lists_names() {
        let registry = StrategyRegistry::with_builtins();
        let err = registry.validate("yolo").unwrap_err();
        let StrategyError::Unknown { name, available } = err else {
            panic!("wrong error");
        };
        assert_eq!(name, "yolo");
        assert!(available.windows(2).all(|w| w[0] < w[1]));
        assert!(available.contains(&"all_in".to_string()));
    }

    fn fixed(_: &StrategyContext<'_>, _: &mut dyn RngCore) -> f64 {
        1234.0
    }

    #[test]
    fn test_register_function() {
        let mut registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        registry.register("fixed", Arc::new(fixed));
        assert!(registry.get("fixed").is_ok());
        assert_eq!(registry.names(), vec!["fixed".to_string()]);
    }
}
