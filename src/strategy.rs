//! Investment strategies.
//!
//! A strategy answers one question per round: how much of the team's funds
//! to spend. It sees a read-only [`StrategyContext`] and an RNG owned by
//! the game, so a seeded game stays reproducible even with a randomised
//! strategy. The game clamps whatever comes back to the funds available.
//!
//! Strategies are looked up by name in a [`StrategyRegistry`]. Learned
//! policies plug in through [`InvestmentModel`]: the model is constructed
//! by the caller and registered explicitly, never loaded behind a global.

mod builtin;
mod context;
mod model;
mod registry;

pub use builtin::builtin_strategies;
pub use context::StrategyContext;
pub use model::{InvestmentModel, LogisticModel, ModelStrategy, FEATURE_COUNT};
pub use registry::StrategyRegistry;

use rand::RngCore;

/// An investment policy.
pub trait Strategy: Send + Sync {
    /// Amount to invest this round. Values outside `[0, funds]` are clamped
    /// by the caller.
    fn invest(&self, ctx: &StrategyContext<'_>, rng: &mut dyn RngCore) -> f64;
}

impl<F> Strategy for F
where
    F: Fn(&StrategyContext<'_>, &mut dyn RngCore) -> f64 + Send + Sync,
{
    fn invest(&self, ctx: &StrategyContext<'_>, rng: &mut dyn RngCore) -> f64 {
        self(ctx, rng)
    }
}
