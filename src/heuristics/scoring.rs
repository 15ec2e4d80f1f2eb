//! Piecewise-linear scoring rules
//!
//! A [`ScoringRule`] maps a raw feature value to a suspicion score in [0, 1].
//! The map has four break points:
//!
//! ```text
//! lo2 = normal_low  * clamp_low_multiplier
//! lo1 = normal_low
//! hi1 = normal_high
//! hi2 = normal_high * clamp_high_multiplier
//! ```
//!
//! Inside `[lo1, hi1]` the score interpolates from `score_at_low` to
//! `score_at_high`. Outside, it ramps linearly toward a saturated extreme and
//! stays there past `lo2` / `hi2`. Each side saturates at 1.0 when its bound
//! score is at least 0.5 and at 0.0 otherwise, so the same primitive expresses
//! both U-shaped ("too slow and too fast are suspicious") and monotonic rules.

use crate::error::ScoreError;
use serde::{Deserialize, Serialize};

/// Bound scores at or above this value saturate toward 1.0
const SATURATION_PIVOT: f64 = 0.5;

/// Configuration for one piecewise-linear score map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScoringRuleFields", into = "ScoringRuleFields")]
pub struct ScoringRule {
    normal_low: f64,
    normal_high: f64,
    score_at_low: f64,
    score_at_high: f64,
    clamp_low_multiplier: f64,
    clamp_high_multiplier: f64,
}

/// Serialized form of a scoring rule, validated on conversion
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScoringRuleFields {
    normal_low: f64,
    normal_high: f64,
    score_at_low: f64,
    score_at_high: f64,
    clamp_low_multiplier: f64,
    clamp_high_multiplier: f64,
}

impl TryFrom<ScoringRuleFields> for ScoringRule {
    type Error = ScoreError;

    fn try_from(f: ScoringRuleFields) -> Result<Self, Self::Error> {
        ScoringRule::new(
            f.normal_low,
            f.normal_high,
            f.score_at_low,
            f.score_at_high,
            f.clamp_low_multiplier,
            f.clamp_high_multiplier,
        )
    }
}

impl From<ScoringRule> for ScoringRuleFields {
    fn from(r: ScoringRule) -> Self {
        Self {
            normal_low: r.normal_low,
            normal_high: r.normal_high,
            score_at_low: r.score_at_low,
            score_at_high: r.score_at_high,
            clamp_low_multiplier: r.clamp_low_multiplier,
            clamp_high_multiplier: r.clamp_high_multiplier,
        }
    }
}

impl ScoringRule {
    /// Create a validated rule.
    ///
    /// Requires finite parameters, `normal_low < normal_high`, bound scores in
    /// [0, 1], and multipliers that keep `lo2 <= lo1` and `hi1 <= hi2`.
    pub fn new(
        normal_low: f64,
        normal_high: f64,
        score_at_low: f64,
        score_at_high: f64,
        clamp_low_multiplier: f64,
        clamp_high_multiplier: f64,
    ) -> Result<Self, ScoreError> {
        let params = [
            normal_low,
            normal_high,
            score_at_low,
            score_at_high,
            clamp_low_multiplier,
            clamp_high_multiplier,
        ];
        if params.iter().any(|p| !p.is_finite()) {
            return Err(ScoreError::InvalidRule(
                "all parameters must be finite".to_string(),
            ));
        }
        if normal_low >= normal_high {
            return Err(ScoreError::InvalidRule(format!(
                "normal_low ({normal_low}) must be below normal_high ({normal_high})"
            )));
        }
        if !(0.0..=1.0).contains(&score_at_low) || !(0.0..=1.0).contains(&score_at_high) {
            return Err(ScoreError::InvalidRule(format!(
                "bound scores must lie in [0, 1], got {score_at_low} and {score_at_high}"
            )));
        }

        let rule = Self {
            normal_low,
            normal_high,
            score_at_low,
            score_at_high,
            clamp_low_multiplier,
            clamp_high_multiplier,
        };
        if rule.lower_clamp() > normal_low {
            return Err(ScoreError::InvalidRule(format!(
                "low clamp {} lies above normal_low {normal_low}",
                rule.lower_clamp()
            )));
        }
        if rule.upper_clamp() < normal_high {
            return Err(ScoreError::InvalidRule(format!(
                "high clamp {} lies below normal_high {normal_high}",
                rule.upper_clamp()
            )));
        }
        Ok(rule)
    }

    /// Built-in rule whose parameters are checked by [`ScoringRule::check`] in tests
    pub(crate) const fn preset(
        normal_low: f64,
        normal_high: f64,
        score_at_low: f64,
        score_at_high: f64,
        clamp_low_multiplier: f64,
        clamp_high_multiplier: f64,
    ) -> Self {
        Self {
            normal_low,
            normal_high,
            score_at_low,
            score_at_high,
            clamp_low_multiplier,
            clamp_high_multiplier,
        }
    }

    /// Re-run construction checks on this rule
    pub fn check(&self) -> Result<(), ScoreError> {
        ScoringRule::new(
            self.normal_low,
            self.normal_high,
            self.score_at_low,
            self.score_at_high,
            self.clamp_low_multiplier,
            self.clamp_high_multiplier,
        )
        .map(|_| ())
    }

    pub fn normal_low(&self) -> f64 {
        self.normal_low
    }

    pub fn normal_high(&self) -> f64 {
        self.normal_high
    }

    pub fn score_at_low(&self) -> f64 {
        self.score_at_low
    }

    pub fn score_at_high(&self) -> f64 {
        self.score_at_high
    }

    /// `lo2`: below this the score is fully saturated
    pub fn lower_clamp(&self) -> f64 {
        self.normal_low * self.clamp_low_multiplier
    }

    /// `hi2`: above this the score is fully saturated
    pub fn upper_clamp(&self) -> f64 {
        self.normal_high * self.clamp_high_multiplier
    }

    /// Saturated value below the normal band
    pub fn low_extreme(&self) -> f64 {
        saturation(self.score_at_low)
    }

    /// Saturated value above the normal band
    pub fn high_extreme(&self) -> f64 {
        saturation(self.score_at_high)
    }

    /// Map a raw value to a score in [0, 1].
    ///
    /// NaN scores 1.0; infinities saturate on their side.
    pub fn score(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 1.0;
        }

        let (lo2, lo1) = (self.lower_clamp(), self.normal_low);
        let (hi1, hi2) = (self.normal_high, self.upper_clamp());

        let score = if value >= lo1 && value <= hi1 {
            lerp(self.score_at_low, self.score_at_high, (value - lo1) / (hi1 - lo1))
        } else if value < lo1 {
            if value <= lo2 {
                self.low_extreme()
            } else {
                // lo2 < value < lo1, so lo1 - lo2 > 0
                let t = (value - lo2) / (lo1 - lo2);
                lerp(self.low_extreme(), self.score_at_low, t)
            }
        } else if value >= hi2 {
            self.high_extreme()
        } else {
            let t = (value - hi1) / (hi2 - hi1);
            lerp(self.score_at_high, self.high_extreme(), t)
        };

        score.clamp(0.0, 1.0)
    }
}

fn saturation(bound_score: f64) -> f64 {
    if bound_score >= SATURATION_PIVOT {
        1.0
    } else {
        0.0
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Round to 5 decimal places, the precision of exported scores
pub fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}
