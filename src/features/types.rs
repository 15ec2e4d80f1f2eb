//! Feature record types
//!
//! A [`SessionFeatures`] record is produced once per session by the
//! [`FeatureEngineer`](crate::features::FeatureEngineer) and never mutated
//! afterwards. Each sub-extractor result is wrapped in [`Extracted`] so that a
//! feature computed from real data can be told apart from a fail-safe default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Result of one sub-extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extracted<T> {
    /// Value computed from the session data
    Computed(T),
    /// Extraction failed; `value` is the fully-suspicious default
    Degraded { value: T, reason: String },
}

impl<T> Extracted<T> {
    /// The carried value, computed or default
    pub fn value(&self) -> &T {
        match self {
            Extracted::Computed(value) => value,
            Extracted::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extracted::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Extracted::Computed(_) => None,
            Extracted::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U, F: FnOnce(&T) -> U>(&self, f: F) -> Extracted<U> {
        match self {
            Extracted::Computed(value) => Extracted::Computed(f(value)),
            Extracted::Degraded { value, reason } => Extracted::Degraded {
                value: f(value),
                reason: reason.clone(),
            },
        }
    }
}

/// Stable names of the scalar features
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKey {
    #[serde(rename = "mouse_movement_stddev_velocity")]
    VelocityStd,
    #[serde(rename = "mouse_movement_avg_velocity")]
    VelocityAvg,
    #[serde(rename = "pixel_per_movement")]
    PixelPerMovement,
    #[serde(rename = "mouse_movement_count")]
    MovementCount,
    #[serde(rename = "overall_session_angle_std")]
    AngleStd,
    #[serde(rename = "session_time")]
    SessionTime,
    #[serde(rename = "mouse_down_up_features")]
    PressMismatchRatio,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 7] = [
        FeatureKey::VelocityStd,
        FeatureKey::VelocityAvg,
        FeatureKey::PixelPerMovement,
        FeatureKey::MovementCount,
        FeatureKey::AngleStd,
        FeatureKey::SessionTime,
        FeatureKey::PressMismatchRatio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKey::VelocityStd => "mouse_movement_stddev_velocity",
            FeatureKey::VelocityAvg => "mouse_movement_avg_velocity",
            FeatureKey::PixelPerMovement => "pixel_per_movement",
            FeatureKey::MovementCount => "mouse_movement_count",
            FeatureKey::AngleStd => "overall_session_angle_std",
            FeatureKey::SessionTime => "session_time",
            FeatureKey::PressMismatchRatio => "mouse_down_up_features",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded click matched to a scripted target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedClick {
    /// Scripted action this click satisfied
    pub action_id: String,
    pub x: f64,
    pub y: f64,
    pub at: DateTime<Utc>,
}

/// Outcome of matching recorded clicks against the action script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickCompliance {
    /// Every scripted click matched, in script order
    pub compliant: bool,
    /// Number of scripted click targets
    pub expected: usize,
    /// Matched clicks in script order
    pub matched: Vec<MatchedClick>,
}

impl ClickCompliance {
    /// Fail-safe default: nothing matched
    pub fn non_compliant(expected: usize) -> Self {
        Self {
            compliant: false,
            expected,
            matched: Vec::new(),
        }
    }

    /// Matched click timestamps, the segmentation boundaries for path analysis
    pub fn boundaries(&self) -> Vec<DateTime<Utc>> {
        self.matched.iter().map(|m| m.at).collect()
    }
}

/// Movement statistics over the whole session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicFeatures {
    /// Population standard deviation of per-step velocity (px/s)
    #[serde(rename = "mouse_movement_stddev_velocity")]
    pub velocity_std: f64,
    /// Mean per-step velocity (px/s)
    #[serde(rename = "mouse_movement_avg_velocity")]
    pub velocity_avg: f64,
    /// Total movement samples recorded
    #[serde(rename = "mouse_movement_count")]
    pub movement_count: usize,
    /// Circular standard deviation of sample directions (degrees)
    #[serde(rename = "overall_session_angle_std")]
    pub angle_std: f64,
    /// Total path length divided by sample count
    #[serde(rename = "pixel_per_movement")]
    pub pixel_per_movement: f64,
}

impl KinematicFeatures {
    /// Zero-information features; every statistic scores as suspicious
    pub fn empty(movement_count: usize) -> Self {
        Self {
            velocity_std: 0.0,
            velocity_avg: 0.0,
            movement_count,
            angle_std: 0.0,
            pixel_per_movement: 0.0,
        }
    }
}

/// Linearity of the movement between two consecutive matched clicks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalLinearity {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Movement samples strictly inside the interval
    pub point_count: usize,
    /// Chord length over travelled length (1.0 = perfectly straight)
    pub straightness: f64,
    /// `1 - mean(|turning angle|) / π`
    pub angular_consistency: f64,
    /// `mean(|turning angle|) / π`
    pub avg_turning_angle: f64,
    /// Circular standard deviation of point directions (degrees)
    pub angle_std: f64,
    /// Too few points (or no displacement); values are the maximally linear default
    pub degenerate: bool,
}

/// Path linearity for every inter-click interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathFeatures {
    /// At least one interval was available
    pub valid: bool,
    pub intervals: Vec<IntervalLinearity>,
}

impl PathFeatures {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            intervals: Vec::new(),
        }
    }
}

/// Spatial corroboration of press events by movement samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressConsistency {
    pub press_count: usize,
    pub mismatched: usize,
    /// `mismatched / press_count`, 0 when there were no presses
    pub mismatch_ratio: f64,
}

impl PressConsistency {
    /// Fail-safe default: every press treated as uncorroborated
    pub fn all_mismatched(press_count: usize) -> Self {
        Self {
            press_count,
            mismatched: press_count,
            mismatch_ratio: 1.0,
        }
    }
}

/// The feature record for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeatures {
    pub compliance: Extracted<ClickCompliance>,
    pub kinematics: Extracted<KinematicFeatures>,
    pub paths: Extracted<PathFeatures>,
    pub press: Extracted<PressConsistency>,
    /// Seconds between first and last movement sample
    pub session_time: Extracted<f64>,
    /// Recorded click events
    pub click_count: usize,
}

impl SessionFeatures {
    /// Look up a scalar feature by its stable key
    pub fn scalar(&self, key: FeatureKey) -> Extracted<f64> {
        match key {
            FeatureKey::VelocityStd => self.kinematics.map(|k| k.velocity_std),
            FeatureKey::VelocityAvg => self.kinematics.map(|k| k.velocity_avg),
            FeatureKey::PixelPerMovement => self.kinematics.map(|k| k.pixel_per_movement),
            FeatureKey::MovementCount => self.kinematics.map(|k| k.movement_count as f64),
            FeatureKey::AngleStd => self.kinematics.map(|k| k.angle_std),
            FeatureKey::SessionTime => self.session_time.clone(),
            FeatureKey::PressMismatchRatio => self.press.map(|p| p.mismatch_ratio),
        }
    }

    /// Total movement samples, known even when kinematics degraded
    pub fn movement_count(&self) -> usize {
        self.kinematics.value().movement_count
    }

    pub fn is_compliant(&self) -> bool {
        !self.compliance.is_degraded() && self.compliance.value().compliant
    }

    /// Every sub-extractor fell back to its default
    pub fn all_degraded(&self) -> bool {
        self.compliance.is_degraded()
            && self.kinematics.is_degraded()
            && self.paths.is_degraded()
            && self.press.is_degraded()
            && self.session_time.is_degraded()
    }

    /// Names and reasons of degraded sub-extractors
    pub fn degradations(&self) -> Vec<(&'static str, &str)> {
        [
            ("click_matcher", self.compliance.reason()),
            ("kinematics", self.kinematics.reason()),
            ("path_linearity", self.paths.reason()),
            ("press_consistency", self.press.reason()),
            ("session_time", self.session_time.reason()),
        ]
        .into_iter()
        .filter_map(|(name, reason)| reason.map(|r| (name, r)))
        .collect()
    }

    /// Flat mapping from stable feature name to value
    pub fn to_map(&self) -> BTreeMap<String, serde_json::Value> {
        let mut map: BTreeMap<String, serde_json::Value> = FeatureKey::ALL
            .iter()
            .map(|key| (key.as_str().to_string(), serde_json::json!(*self.scalar(*key).value())))
            .collect();

        let paths = self.paths.value();
        map.insert("is_valid".to_string(), serde_json::json!(paths.valid));
        map.insert(
            "between_path".to_string(),
            serde_json::to_value(&paths.intervals).unwrap_or_default(),
        );
        map.insert(
            "click_compliant".to_string(),
            serde_json::json!(self.is_compliant()),
        );
        map.insert("mouse_clicks".to_string(), serde_json::json!(self.click_count));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_accessors() {
        let computed: Extracted<f64> = Extracted::Computed(2.5);
        assert_eq!(*computed.value(), 2.5);
        assert!(!computed.is_degraded());
        assert!(computed.reason().is_none());

        let degraded: Extracted<f64> = Extracted::Degraded {
            value: 0.0,
            reason: "bad timestamp".to_string(),
        };
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some("bad timestamp"));
        assert_eq!(*degraded.map(|v| v + 1.0).value(), 1.0);
    }

    #[test]
    fn test_feature_key_names_match_serde() {
        for key in FeatureKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn test_kinematic_features_serialize_with_stable_keys() {
        let value = serde_json::to_value(KinematicFeatures::empty(12)).unwrap();
        assert_eq!(value["mouse_movement_count"], 12);
        assert_eq!(value["pixel_per_movement"], 0.0);
    }
}
