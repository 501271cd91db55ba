//! Empirical outcome distributions.
//!
//! The artifact groups four outcome families by side, round-end reason and
//! a coarse bucket of the CT win probability (the "CSF bucket", stored as
//! a percentage key such as `"45"`). At load time each family is flattened
//! into a single arena of sorted [`CdfEntry`] values plus a small index of
//! buckets per `(side, reason)` group, so sampling never touches a map.
//!
//! ```text
//! Family<T>
//! ├── entries: [e0 e1 e2 | e3 e4 | e5 e6 e7 e8 | ...]   sorted per bucket
//! └── groups[g]: [Bucket{key: 0.0, 0..3}, Bucket{key: 5.0, 3..5}, ...]
//! ```
//!
//! The table is immutable once built and is shared across worker threads
//! behind an `Arc`.

mod cdf;
mod loader;
mod raw;

pub use cdf::{sample_from_cdf, CdfEntry};
pub use loader::DEFAULT_DISTRIBUTIONS_FILE;

use crate::game::{RoundEndReason, Side};

/// Bomb-plant probability used when the artifact has no buckets at all.
const FALLBACK_PLANT_PROBABILITY: f64 = 0.5;

/// A contiguous run of entries for one bucket.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    key: f64,
    start: usize,
    end: usize,
}

/// One outcome family: a flat arena of entries and, per group, the sorted
/// list of bucket ranges into it.
#[derive(Debug, Clone)]
struct Family<T> {
    entries: Vec<CdfEntry<T>>,
    groups: Vec<Vec<Bucket>>,
}

impl<T> Family<T> {
    fn with_groups(n: usize) -> Self {
        Self {
            entries: Vec::new(),
            groups: (0..n).map(|_| Vec::new()).collect(),
        }
    }

    /// Append a bucket. Empty tables are skipped.
    fn push_bucket(&mut self, group: usize, key: f64, mut table: Vec<CdfEntry<T>>) {
        if table.is_empty() {
            return;
        }
        cdf::sort_entries(&mut table);
        let start = self.entries.len();
        self.entries.extend(table);
        let end = self.entries.len();
        if let Some(buckets) = self.groups.get_mut(group) {
            buckets.push(Bucket { key, start, end });
        }
    }

    /// Sort every group's buckets by key.
    fn finish(&mut self) {
        for buckets in &mut self.groups {
            buckets.sort_by(|a, b| a.key.total_cmp(&b.key));
        }
    }

    fn group_is_empty(&self, group: usize) -> bool {
        self.groups.get(group).is_none_or(Vec::is_empty)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Table of the bucket in `group` whose key is closest to `target`.
    /// Ties resolve to the lower key. Empty slice if the group has none.
    fn nearest(&self, group: usize, target: f64) -> &[CdfEntry<T>] {
        let Some(buckets) = self.groups.get(group) else {
            return &[];
        };
        nearest_bucket(buckets, target)
            .and_then(|b| self.entries.get(b.start..b.end))
            .unwrap_or(&[])
    }
}

fn nearest_bucket(buckets: &[Bucket], target: f64) -> Option<&Bucket> {
    let mut best: Option<&Bucket> = None;
    let mut best_diff = f64::INFINITY;
    for bucket in buckets {
        let diff = (bucket.key - target).abs();
        if diff < best_diff {
            best = Some(bucket);
            best_diff = diff;
        }
    }
    best
}

/// Group index for `(side, reason)` families.
const fn side_reason_group(side: Side, reason: RoundEndReason) -> usize {
    side.index() * RoundEndReason::ALL.len() + reason.index()
}

const SIDE_REASON_GROUPS: usize = Side::ALL.len() * RoundEndReason::ALL.len();

/// The immutable, process-wide distribution table.
#[derive(Debug, Clone)]
pub struct DistributionTable {
    csf_r: f64,
    csf_range: (i64, i64),
    /// Grouped by winner side.
    reasons: Family<RoundEndReason>,
    /// `(bucket key, probability)` sorted by key.
    bomb_planted: Vec<(f64, f64)>,
    /// Grouped by `(side, reason)`, bucketed by CSF key.
    survivors: Family<u8>,
    /// Grouped by `(side, reason)`, bucketed by survivor count.
    equipment: Family<f64>,
}

impl DistributionTable {
    /// CSF exponent recorded in the artifact metadata (0 when absent).
    #[must_use]
    pub const fn csf_exponent(&self) -> f64 {
        self.csf_r
    }

    /// CSF bucket range recorded in the artifact metadata.
    #[must_use]
    pub const fn csf_range(&self) -> (i64, i64) {
        self.csf_range
    }

    /// Reason table for rounds won by `winner` at this CT win probability.
    #[must_use]
    pub fn reason_cdf(&self, winner: Side, ct_win_probability: f64) -> &[CdfEntry<RoundEndReason>] {
        self.reasons
            .nearest(winner.index(), percent_key(ct_win_probability))
    }

    /// Probability that the bomb is planted at this CT win probability.
    #[must_use]
    pub fn bomb_plant_probability(&self, ct_win_probability: f64) -> f64 {
        let target = percent_key(ct_win_probability);
        let mut best = None;
        let mut best_diff = f64::INFINITY;
        for &(key, p) in &self.bomb_planted {
            let diff = (key - target).abs();
            if diff < best_diff {
                best = Some(p);
                best_diff = diff;
            }
        }
        best.unwrap_or(FALLBACK_PLANT_PROBABILITY)
    }

    /// Survivor-count table for `side` in a round that ended with `reason`.
    #[must_use]
    pub fn survivor_cdf(
        &self,
        side: Side,
        reason: RoundEndReason,
        ct_win_probability: f64,
    ) -> &[CdfEntry<u8>] {
        self.survivors.nearest(
            side_reason_group(side, reason),
            percent_key(ct_win_probability),
        )
    }

    /// Saved-equipment curve for `side` with `survivors` alive after a round
    /// that ended with `reason`. Falls back to the nearest recorded survivor
    /// count.
    #[must_use]
    pub fn equipment_cdf(&self, side: Side, reason: RoundEndReason, survivors: u8) -> &[CdfEntry<f64>] {
        self.equipment
            .nearest(side_reason_group(side, reason), f64::from(survivors))
    }

    /// Number of individual CDF entries across all families.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.reasons.entries.len() + self.survivors.entries.len() + self.equipment.entries.len()
    }
}

/// CSF bucket keys are percentages.
fn percent_key(probability: f64) -> f64 {
    if probability.is_finite() {
        probability.clamp(0.0, 1.0) * 100.0
    } else {
        50.0
    }
}

/// Table built from the fixture artifact shipped with the tests.
#[cfg(test)]
pub(crate) fn test_table() -> DistributionTable {
    DistributionTable::from_json_str(include_str!("../tests/fixtures/distributions.json")).unwrap()
}
