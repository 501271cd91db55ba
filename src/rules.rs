//! Economic rules for a match.
//!
//! Rules are loaded once before any simulation runs and are read-only for
//! the rest of the process. A rules file is optional: a missing or broken
//! file is logged and the built-in defaults are used instead.
//!
//! All money values are per player; the engine multiplies by
//! [`TEAM_SIZE`] where a team total is needed.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::csf::DEFAULT_CSF_EXPONENT;
use crate::error::RulesError;

/// Players per team.
pub const TEAM_SIZE: u8 = 5;

/// Team size as a float for money arithmetic.
pub const TEAM_SIZE_F: f64 = TEAM_SIZE as f64;

/// Immutable economic constants for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameRules {
    /// Equipment every player gets for free (pistol).
    pub default_equipment: f64,
    /// Per-player funds at the start of each overtime half.
    pub ot_funds: f64,
    /// Per-player equipment at the start of each overtime half.
    pub ot_equipment: f64,
    /// Per-player funds at the start of each regulation half.
    pub starting_funds: f64,
    /// Rounds in a regulation half.
    pub half_length: u32,
    /// Rounds in an overtime half.
    #[serde(rename = "otHalfLength")]
    pub ot_half_length: u32,
    /// Cap on a team's total funds.
    pub max_funds: f64,
    /// `true`: a win lowers the loss-bonus level by one.
    /// `false`: a win resets it to zero.
    pub loss_bonus_calc: bool,
    /// Whether surviving players keep their equipment into the next round.
    pub with_saves: bool,
    /// Per-player loss bonus by level, escalating.
    pub loss_bonus: Vec<f64>,
    /// Per-player win reward indexed by round-end reason code minus one.
    pub round_outcome_reward: [f64; 4],
    /// Per-kill reward.
    pub elimination_reward: f64,
    /// Per-player reward to the T side when a planted bomb is defused.
    #[serde(rename = "bombplantRewardall")]
    pub bombplant_reward_all: f64,
    /// Reward to the planter.
    pub bombplant_reward: f64,
    /// Reward to the defuser.
    pub bombdefuse_reward: f64,
    /// Extra per-kill reward paid to every CT player.
    #[serde(rename = "additionalCTEliminationReward")]
    pub additional_ct_elimination_reward: f64,
    /// Extra per-kill reward paid to every T player.
    #[serde(rename = "additionalTEliminationReward")]
    pub additional_t_elimination_reward: f64,
    /// CSF exponent override. Negative means "use the artifact's value".
    #[serde(rename = "customRValue")]
    pub custom_csf_r: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            default_equipment: 200.0,
            ot_funds: 10_000.0,
            ot_equipment: 200.0,
            starting_funds: 800.0,
            half_length: 15,
            ot_half_length: 3,
            max_funds: 16_000.0 * TEAM_SIZE_F,
            loss_bonus_calc: true,
            with_saves: true,
            loss_bonus: vec![1400.0, 1900.0, 2400.0, 2900.0, 3400.0],
            round_outcome_reward: [3500.0, 3250.0, 3500.0, 3250.0],
            elimination_reward: 300.0,
            bombplant_reward_all: 800.0,
            bombplant_reward: 300.0,
            bombdefuse_reward: 300.0,
            additional_ct_elimination_reward: 0.0,
            additional_t_elimination_reward: 0.0,
            custom_csf_r: -1.0,
        }
    }
}

impl GameRules {
    /// Load rules from `path`, falling back to defaults on any problem.
    ///
    /// `None` or the literal `"default"` selects the defaults directly.
    /// Returns the rules and whether they came from the file.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> (Self, bool) {
        let Some(path) = path.filter(|p| p.as_os_str() != "default") else {
            return (Self::default(), false);
        };

        match Self::load(path) {
            Ok(rules) => {
                info!(path = %path.display(), "loaded custom game rules");
                (rules, true)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default game rules");
                (Self::default(), false)
            }
        }
    }

    /// Load and strictly validate rules from a JSON file.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// merged value fails validation.
    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate rules from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or the result fails
    /// validation.
    pub fn from_json(text: &str) -> Result<Self, RulesError> {
        let rules: Self = serde_json::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RulesError> {
        let money = [
            ("defaultEquipment", self.default_equipment),
            ("startingFunds", self.starting_funds),
            ("otFunds", self.ot_funds),
            ("otEquipment", self.ot_equipment),
            ("maxFunds", self.max_funds),
            ("eliminationReward", self.elimination_reward),
            ("bombplantRewardall", self.bombplant_reward_all),
            ("bombplantReward", self.bombplant_reward),
            ("bombdefuseReward", self.bombdefuse_reward),
            (
                "additionalCTEliminationReward",
                self.additional_ct_elimination_reward,
            ),
            (
                "additionalTEliminationReward",
                self.additional_t_elimination_reward,
            ),
        ];
        for (name, value) in money {
            if !value.is_finite() || value < 0.0 {
                return Err(RulesError::Invalid(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        if self.half_length == 0 {
            return Err(RulesError::Invalid("halfLength must be positive".into()));
        }
        if self.ot_half_length == 0 {
            return Err(RulesError::Invalid("otHalfLength must be positive".into()));
        }

        for (i, reward) in self.round_outcome_reward.iter().enumerate() {
            if !reward.is_finite() || *reward < 0.0 {
                return Err(RulesError::Invalid(format!(
                    "roundOutcomeReward[{i}] must be non-negative"
                )));
            }
        }

        if self.loss_bonus.is_empty() {
            return Err(RulesError::Invalid("lossBonus must not be empty".into()));
        }
        for (i, bonus) in self.loss_bonus.iter().enumerate() {
            if !bonus.is_finite() || *bonus < 0.0 {
                return Err(RulesError::Invalid(format!(
                    "lossBonus[{i}] must be non-negative"
                )));
            }
        }
        if self.loss_bonus.windows(2).any(|w| w[1] < w[0]) {
            return Err(RulesError::Invalid(
                "lossBonus must be non-decreasing".into(),
            ));
        }

        if self.custom_csf_r.is_nan() {
            return Err(RulesError::Invalid("customRValue must be a number".into()));
        }

        Ok(())
    }

    /// Resolve the CSF exponent: the rules override, then the artifact, then
    /// the built-in default.
    #[must_use]
    pub fn csf_exponent(&self, artifact_r: f64) -> f64 {
        if self.custom_csf_r >= 0.0 {
            self.custom_csf_r
        } else if artifact_r > 0.0 {
            artifact_r
        } else {
            DEFAULT_CSF_EXPONENT
        }
    }

    /// Per-player loss bonus for a loss-bonus level, holding flat past the
    /// end of the schedule.
    #[must_use]
    pub fn loss_bonus_for_level(&self, level: usize) -> f64 {
        let idx = level.min(self.max_loss_bonus_level());
        self.loss_bonus.get(idx).copied().unwrap_or(0.0)
    }

    /// Highest meaningful loss-bonus level.
    #[must_use]
    pub fn max_loss_bonus_level(&self) -> usize {
        self.loss_bonus.len().saturating_sub(1)
    }

    /// Rounds in regulation (both halves).
    #[must_use]
    pub const fn regulation_rounds(&self) -> u32 {
        self.half_length * 2
    }

    /// Rounds in one overtime period (both overtime halves).
    #[must_use]
    pub const fn overtime_period_rounds(&self) -> u32 {
        self.ot_half_length * 2
    }

    /// Score needed to win during overtime period `period`
    /// (0 = regulation).
    #[must_use]
    pub const fn score_to_win(&self, period: u32) -> u32 {
        self.half_length + period * self.ot_half_length + 1
    }
}
