//! Learned investment policies behind an explicit handle.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::RngCore;
use serde::Deserialize;

use super::{Strategy, StrategyContext};
use crate::error::StrategyError;

/// Number of features [`ModelStrategy`] extracts from a context.
pub const FEATURE_COUNT: usize = 7;

/// A trained model mapping context features to the fraction of funds to
/// invest.
pub trait InvestmentModel: Send + Sync {
    /// Fraction in `[0, 1]`; values outside are clamped by the caller.
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64;
}

/// Adapts an [`InvestmentModel`] to the [`Strategy`] interface.
#[derive(Clone)]
pub struct ModelStrategy {
    model: Arc<dyn InvestmentModel>,
}

impl fmt::Debug for ModelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStrategy").finish_non_exhaustive()
    }
}

impl ModelStrategy {
    /// Wrap a constructed model.
    #[must_use]
    pub fn new(model: Arc<dyn InvestmentModel>) -> Self {
        Self { model }
    }

    /// Feature vector: own score, opponent score, score difference,
    /// equipment and funds in thousands, losing streak, CT flag.
    #[must_use]
    pub fn features(ctx: &StrategyContext<'_>) -> [f64; FEATURE_COUNT] {
        [
            f64::from(ctx.own_score),
            f64::from(ctx.opponent_score),
            f64::from(ctx.own_score) - f64::from(ctx.opponent_score),
            ctx.equipment / 1000.0,
            ctx.funds / 1000.0,
            f64::from(ctx.consecutive_losses),
            if ctx.side.is_ct() { 1.0 } else { 0.0 },
        ]
    }
}

impl Strategy for ModelStrategy {
    fn invest(&self, ctx: &StrategyContext<'_>, _rng: &mut dyn RngCore) -> f64 {
        let fraction = self.model.predict(&Self::features(ctx));
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        ctx.funds * fraction
    }
}

/// Logistic regression over the [`ModelStrategy`] features.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
    /// One weight per feature.
    pub coefficients: Vec<f64>,
    /// Bias term.
    #[serde(default)]
    pub intercept: f64,
}

impl LogisticModel {
    /// Load a model from a JSON file with `coefficients` and `intercept`.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Model`] if the file cannot be read or
    /// parsed, or if the coefficient count is wrong.
    pub fn load(path: &Path) -> Result<Self, StrategyError> {
        let model_err = |message: String| StrategyError::Model {
            path: path.display().to_string(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| model_err(e.to_string()))?;
        let model: Self = serde_json::from_str(&text).map_err(|e| model_err(e.to_string()))?;
        if model.coefficients.len() != FEATURE_COUNT {
            return Err(model_err(format!(
                "expected {FEATURE_COUNT} coefficients, found {}",
                model.coefficients.len()
            )));
        }
        Ok(model)
    }
}

impl InvestmentModel for LogisticModel {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        let logit = self
            .coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (w, x)| acc + w * x);
        1.0 / (1.0 + (-logit).exp())
    }
}
