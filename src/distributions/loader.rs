//! Reading and flattening the distributions artifact.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::raw::RawArtifact;
use super::{side_reason_group, CdfEntry, DistributionTable, Family, SIDE_REASON_GROUPS};
use crate::error::DistributionError;
use crate::game::{RoundEndReason, Side};
use crate::rules::TEAM_SIZE;

/// File name looked up when no explicit path is given.
pub const DEFAULT_DISTRIBUTIONS_FILE: &str = "distributions.json";

impl DistributionTable {
    /// Load the artifact from `path`.
    ///
    /// With `None`, [`DEFAULT_DISTRIBUTIONS_FILE`] is read from the working
    /// directory and then from its parent.
    ///
    /// # Errors
    ///
    /// Any problem with the artifact is fatal: unreadable or empty file,
    /// malformed JSON, a missing family, an unparseable key, an unknown
    /// side or reason code, or a negative CSF exponent.
    pub fn load(path: Option<&Path>) -> Result<Self, DistributionError> {
        let candidates: Vec<PathBuf> = match path {
            Some(p) => vec![p.to_path_buf()],
            None => vec![
                PathBuf::from(DEFAULT_DISTRIBUTIONS_FILE),
                Path::new("..").join(DEFAULT_DISTRIBUTIONS_FILE),
            ],
        };

        let mut last_err = None;
        for candidate in &candidates {
            match fs::read(candidate) {
                Ok(bytes) => {
                    if bytes.is_empty() {
                        return Err(DistributionError::Empty(candidate.clone()));
                    }
                    let table = Self::from_slice(&bytes)?;
                    info!(
                        path = %candidate.display(),
                        entries = table.entry_count(),
                        csf_r = table.csf_exponent(),
                        "loaded outcome distributions"
                    );
                    return Ok(table);
                }
                Err(e) => {
                    debug!(path = %candidate.display(), error = %e, "distributions not found here");
                    last_err = Some(e);
                }
            }
        }

        Err(DistributionError::Io {
            tried: candidates,
            source: last_err.unwrap_or_else(|| std::io::Error::other("no candidate paths")),
        })
    }

    /// Build a table from JSON text.
    ///
    /// # Errors
    ///
    /// See [`DistributionTable::load`].
    pub fn from_json_str(text: &str) -> Result<Self, DistributionError> {
        Self::from_slice(text.as_bytes())
    }

    /// Build a table from JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`DistributionTable::load`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DistributionError> {
        let raw: RawArtifact = serde_json::from_slice(bytes)?;
        build(raw)
    }
}

fn build(raw: RawArtifact) -> Result<DistributionTable, DistributionError> {
    let families = raw.distributions;

    if families.round_end_reason.is_empty() {
        return Err(DistributionError::MissingFamily("round end reason"));
    }
    if families.survivors.is_empty() {
        return Err(DistributionError::MissingFamily("survivors"));
    }
    if families.equipment_saved.is_empty() {
        return Err(DistributionError::MissingFamily("equipment saved"));
    }
    if families.bomb_planted.t.is_empty() {
        return Err(DistributionError::MissingFamily("bomb planted"));
    }
    let csf_r = raw.metadata.csf_r_value;
    if csf_r < 0.0 || csf_r.is_nan() {
        return Err(DistributionError::NegativeExponent(csf_r));
    }

    let mut reasons = Family::with_groups(Side::ALL.len());
    for (side_key, buckets) in &families.round_end_reason {
        let side = parse_side(side_key)?;
        for (bucket_key, bucket) in buckets {
            let location = format!("round_end_reason[{side_key}][{bucket_key}]");
            let key = parse_bucket(bucket_key, &location)?;
            let mut table = Vec::with_capacity(bucket.cumulative_distribution.len());
            for (threshold_key, entry) in &bucket.cumulative_distribution {
                let threshold = parse_threshold(threshold_key, &location)?;
                let reason = parse_reason_code(entry.reason)?;
                table.push(CdfEntry::new(threshold, reason));
            }
            reasons.push_bucket(side.index(), key, table);
        }
    }
    reasons.finish();
    for side in Side::ALL {
        if reasons.group_is_empty(side.index()) {
            return Err(DistributionError::EmptySide {
                family: "round end reason",
                side: side.label(),
            });
        }
    }

    let mut bomb_planted = Vec::with_capacity(families.bomb_planted.t.len());
    for (bucket_key, &p) in &families.bomb_planted.t {
        let key = parse_bucket(bucket_key, "bomb_planted[T]")?;
        if !p.is_finite() {
            return Err(DistributionError::BadThreshold {
                key: p.to_string(),
                location: format!("bomb_planted[T][{bucket_key}]"),
            });
        }
        bomb_planted.push((key, p.clamp(0.0, 1.0)));
    }
    bomb_planted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut survivors = Family::with_groups(SIDE_REASON_GROUPS);
    for (side_key, by_reason) in &families.survivors {
        let side = parse_side(side_key)?;
        for (reason_key, reason_data) in by_reason {
            let reason = parse_reason_key(reason_key)?;
            let group = side_reason_group(side, reason);
            for (bucket_key, bucket) in &reason_data.csf_distributions {
                let location = format!("survivors[{side_key}][{reason_key}][{bucket_key}]");
                let key = parse_bucket(bucket_key, &location)?;
                let mut table = Vec::with_capacity(bucket.cumulative_lookup.len());
                for (threshold_key, &count) in &bucket.cumulative_lookup {
                    let threshold = parse_threshold(threshold_key, &location)?;
                    table.push(CdfEntry::new(threshold, clamp_survivors(count)));
                }
                survivors.push_bucket(group, key, table);
            }
        }
    }
    survivors.finish();
    if survivors.is_empty() {
        return Err(DistributionError::MissingFamily("survivors"));
    }

    let mut equipment = Family::with_groups(SIDE_REASON_GROUPS);
    for (side_key, by_reason) in &families.equipment_saved {
        let side = parse_side(side_key)?;
        for (reason_key, reason_data) in by_reason {
            let reason = parse_reason_key(reason_key)?;
            let group = side_reason_group(side, reason);
            for (count_key, curve) in &reason_data.survivor_distributions {
                let location = format!("equipment_saved[{side_key}][{reason_key}][{count_key}]");
                let count = count_key
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| DistributionError::BadBucket {
                        key: count_key.clone(),
                        location: location.clone(),
                    })?;
                let mut table = Vec::with_capacity(curve.ecdf_lookup.len());
                for (percentile_key, &value) in &curve.ecdf_lookup {
                    let percentile = parse_threshold(percentile_key, &location)?;
                    let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
                    table.push(CdfEntry::new(percentile, value));
                }
                equipment.push_bucket(group, f64::from(count), table);
            }
        }
    }
    equipment.finish();
    if equipment.is_empty() {
        return Err(DistributionError::MissingFamily("equipment saved"));
    }

    Ok(DistributionTable {
        csf_r,
        csf_range: (raw.metadata.csf_ranges.min, raw.metadata.csf_ranges.max),
        reasons,
        bomb_planted,
        survivors,
        equipment,
    })
}

fn parse_side(key: &str) -> Result<Side, DistributionError> {
    Side::from_label(key).ok_or_else(|| DistributionError::UnknownSide(key.to_string()))
}

fn parse_reason_key(key: &str) -> Result<RoundEndReason, DistributionError> {
    key.trim()
        .parse::<i64>()
        .ok()
        .and_then(RoundEndReason::from_code)
        .ok_or_else(|| DistributionError::UnknownReason(key.to_string()))
}

fn parse_reason_code(code: i64) -> Result<RoundEndReason, DistributionError> {
    RoundEndReason::from_code(code).ok_or_else(|| DistributionError::UnknownReason(code.to_string()))
}

fn parse_threshold(key: &str, location: &str) -> Result<f64, DistributionError> {
    key.trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| DistributionError::BadThreshold {
            key: key.to_string(),
            location: location.to_string(),
        })
}

fn parse_bucket(key: &str, location: &str) -> Result<f64, DistributionError> {
    key.trim()
        .parse::<f64>()
        .ok()
        .filter(|k| k.is_finite())
        .ok_or_else(|| DistributionError::BadBucket {
            key: key.to_string(),
            location: location.to_string(),
        })
}

fn clamp_survivors(count: i64) -> u8 {
    u8::try_from(count.clamp(0, i64::from(TEAM_SIZE))).unwrap_or(TEAM_SIZE)
}
