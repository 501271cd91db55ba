//! Small shared vocabulary: sides, round-end reasons and team slots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side a team plays in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Counter-terrorists: defend bomb sites.
    #[serde(rename = "CT")]
    CounterTerrorist,
    /// Terrorists: plant the bomb.
    #[serde(rename = "T")]
    Terrorist,
}

impl Side {
    /// Both sides, CT first.
    pub const ALL: [Self; 2] = [Self::CounterTerrorist, Self::Terrorist];

    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::CounterTerrorist => Self::Terrorist,
            Self::Terrorist => Self::CounterTerrorist,
        }
    }

    /// Label used in the distributions artifact.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CounterTerrorist => "CT",
            Self::Terrorist => "T",
        }
    }

    /// Parse an artifact label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "CT" => Some(Self::CounterTerrorist),
            "T" => Some(Self::Terrorist),
            _ => None,
        }
    }

    /// Dense index, CT = 0.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::CounterTerrorist => 0,
            Self::Terrorist => 1,
        }
    }

    /// Whether this is the CT side.
    #[must_use]
    pub const fn is_ct(self) -> bool {
        matches!(self, Self::CounterTerrorist)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a round ended.
///
/// The numeric codes are the ones used by the distributions artifact and
/// by the reward table in [`crate::rules::GameRules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum RoundEndReason {
    /// Bomb exploded. T win.
    BombExploded = 1,
    /// All CT players eliminated. T win.
    TerroristsEliminatedCt = 2,
    /// Bomb defused. CT win.
    BombDefused = 3,
    /// All T players eliminated or time ran out. CT win.
    CtEliminationOrTime = 4,
}

impl RoundEndReason {
    /// All reasons in code order.
    pub const ALL: [Self; 4] = [
        Self::BombExploded,
        Self::TerroristsEliminatedCt,
        Self::BombDefused,
        Self::CtEliminationOrTime,
    ];

    /// Numeric code, 1..=4.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Dense index, 0..=3.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Reason for a numeric code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::BombExploded),
            2 => Some(Self::TerroristsEliminatedCt),
            3 => Some(Self::BombDefused),
            4 => Some(Self::CtEliminationOrTime),
            _ => None,
        }
    }

    /// Side that wins a round ending this way.
    #[must_use]
    pub const fn winner(self) -> Side {
        match self {
            Self::BombExploded | Self::TerroristsEliminatedCt => Side::Terrorist,
            Self::BombDefused | Self::CtEliminationOrTime => Side::CounterTerrorist,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BombExploded => "bomb exploded",
            Self::TerroristsEliminatedCt => "T elimination",
            Self::BombDefused => "bomb defused",
            Self::CtEliminationOrTime => "CT elimination / time",
        }
    }
}

impl From<RoundEndReason> for u8 {
    fn from(reason: RoundEndReason) -> Self {
        reason.code()
    }
}

impl TryFrom<u8> for RoundEndReason {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code)).ok_or_else(|| format!("unknown round end reason {code}"))
    }
}

impl fmt::Display for RoundEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one of the two teams in a game, independent of side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamSlot {
    /// The first team (team A).
    One,
    /// The second team (team B).
    Two,
}

impl TeamSlot {
    /// The other team.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Dense index, `One` = 0.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}
