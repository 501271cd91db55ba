//! Error types for loading inputs and configuring simulations.
//!
//! Only startup can fail. Once the distribution table and the strategy
//! registry are in place, a simulated game has no error path; per-job
//! trouble (panics, timeouts) is reported as a [`crate::sim::JobFailure`]
//! value instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate the empirical distributions artifact.
///
/// Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum DistributionError {
    /// The artifact could not be read from any candidate path.
    #[error("failed to read distributions file from {}: {source}", display_paths(.tried))]
    Io {
        /// Paths that were tried, in order.
        tried: Vec<PathBuf>,
        /// The error from the last attempt.
        #[source]
        source: io::Error,
    },
    /// The artifact exists but is zero bytes long.
    #[error("distributions file {} is empty", .0.display())]
    Empty(PathBuf),
    /// The artifact is not valid JSON for the expected layout.
    #[error("failed to parse distributions file: {0}")]
    Json(#[from] serde_json::Error),
    /// One of the four required outcome families is absent or empty.
    #[error("distributions file does not contain {0} data")]
    MissingFamily(&'static str),
    /// A threshold or percentile key did not parse as a float.
    #[error("invalid threshold '{key}' in {location}")]
    BadThreshold {
        /// The offending key.
        key: String,
        /// Where in the artifact it was found.
        location: String,
    },
    /// A CSF bucket key did not parse as a number.
    #[error("invalid CSF bucket '{key}' in {location}")]
    BadBucket {
        /// The offending key.
        key: String,
        /// Where in the artifact it was found.
        location: String,
    },
    /// A side key other than `CT` or `T`.
    #[error("unknown side '{0}'")]
    UnknownSide(String),
    /// A round-end reason code outside 1..=4.
    #[error("unknown round end reason code '{0}'")]
    UnknownReason(String),
    /// The CSF exponent in the metadata is negative.
    #[error("CSF exponent must be non-negative, got {0}")]
    NegativeExponent(f64),
    /// A family is present but has no usable entries for a side.
    #[error("{family} has no entries for side {side}")]
    EmptySide {
        /// Outcome family name.
        family: &'static str,
        /// Side label.
        side: &'static str,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Failure to read game rules.
///
/// Never fatal: [`crate::rules::GameRules::load_or_default`] logs it and
/// substitutes the defaults.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The rules file could not be opened.
    #[error("could not open game rules file: {0}")]
    Io(#[from] io::Error),
    /// The rules file is not valid JSON.
    #[error("could not parse game rules file: {0}")]
    Json(#[from] serde_json::Error),
    /// A merged value failed strict validation.
    #[error("invalid game rules: {0}")]
    Invalid(String),
}

/// Failure to resolve a strategy identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// No strategy is registered under this name.
    #[error("unknown strategy '{name}'. Available strategies:\n  {}", .available.join(", "))]
    Unknown {
        /// The name that was asked for.
        name: String,
        /// All registered names, sorted.
        available: Vec<String>,
    },
    /// A model file for a learned strategy could not be used.
    #[error("failed to load model '{path}': {message}")]
    Model {
        /// Model file path.
        path: String,
        /// What went wrong.
        message: String,
    },
}

/// Any startup failure.
#[derive(Debug, Error)]
pub enum SimError {
    /// Distribution artifact problem.
    #[error(transparent)]
    Distributions(#[from] DistributionError),
    /// Strategy configuration problem.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    /// Batch configuration problem.
    #[error("invalid batch configuration: {0}")]
    Config(String),
    /// I/O while preparing output.
    #[error(transparent)]
    Io(#[from] io::Error),
}
