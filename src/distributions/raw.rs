//! Serde mirror of the distributions artifact as written to disk.
//!
//! Every map is a `BTreeMap` so that iteration order, and therefore the
//! layout of the loaded arena, does not depend on hashing. Descriptive
//! fields (`reason_name`, `n_rounds`, ...) are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtifact {
    #[serde(default)]
    pub(crate) metadata: RawMetadata,
    #[serde(default)]
    pub(crate) distributions: RawFamilies,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawMetadata {
    #[serde(default)]
    pub(crate) csf_r_value: f64,
    #[serde(default)]
    pub(crate) csf_ranges: RawRange,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub(crate) struct RawRange {
    #[serde(default)]
    pub(crate) min: i64,
    #[serde(default)]
    pub(crate) max: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFamilies {
    /// side -> csf bucket -> reason table
    #[serde(default)]
    pub(crate) round_end_reason: BTreeMap<String, BTreeMap<String, RawReasonBucket>>,
    #[serde(default)]
    pub(crate) bomb_planted: RawBombPlanted,
    /// side -> reason code -> per-bucket survivor tables
    #[serde(default)]
    pub(crate) survivors: BTreeMap<String, BTreeMap<String, RawSurvivorReason>>,
    /// side -> reason code -> per-survivor-count equipment curves
    #[serde(default)]
    pub(crate) equipment_saved: BTreeMap<String, BTreeMap<String, RawEquipmentReason>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawReasonBucket {
    #[serde(default)]
    pub(crate) cumulative_distribution: BTreeMap<String, RawReasonEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawReasonEntry {
    pub(crate) reason: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawBombPlanted {
    #[serde(default, rename = "T")]
    pub(crate) t: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSurvivorReason {
    #[serde(default)]
    pub(crate) csf_distributions: BTreeMap<String, RawSurvivorBucket>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSurvivorBucket {
    #[serde(default)]
    pub(crate) cumulative_lookup: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEquipmentReason {
    #[serde(default)]
    pub(crate) survivor_distributions: BTreeMap<String, RawEquipmentCurve>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawEquipmentCurve {
    #[serde(default)]
    pub(crate) ecdf_lookup: BTreeMap<String, f64>,
}
