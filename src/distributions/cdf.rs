//! Inverse-transform lookup over a sorted cumulative table.

use std::cmp::Ordering;

/// One step of a cumulative distribution: every draw at or below
/// `threshold` (and above the previous step) maps to `value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdfEntry<T> {
    /// Cumulative probability or percentile in `[0, 1]`.
    pub threshold: f64,
    /// Outcome for this step.
    pub value: T,
}

impl<T> CdfEntry<T> {
    /// Create an entry.
    #[must_use]
    pub const fn new(threshold: f64, value: T) -> Self {
        Self { threshold, value }
    }
}

/// Return the value of the first entry whose threshold is at least `u`.
///
/// Draws past the final threshold (a table whose last step is below 1.0,
/// or `u` above 1.0) resolve to the last entry. `None` only for an empty
/// table.
///
/// `entries` must be sorted ascending by threshold; the loader guarantees
/// this once at load time.
#[must_use]
pub fn sample_from_cdf<T: Copy>(entries: &[CdfEntry<T>], u: f64) -> Option<T> {
    let last = entries.last()?;
    // partition_point needs a predicate that is true then false over the
    // slice, which a sorted threshold column satisfies.
    let idx = entries.partition_point(|e| e.threshold < u);
    Some(entries.get(idx).map_or(last.value, |e| e.value))
}

/// Sort entries ascending by threshold. Equal thresholds keep input order.
pub(crate) fn sort_entries<T>(entries: &mut [CdfEntry<T>]) {
    entries.sort_by(|a, b| {
        a.threshold
            .partial_cmp(&b.threshold)
            .unwrap_or(Ordering::Equal)
    });
}
