//! Scoring configuration
//!
//! Every tunable constant of the pipeline lives here. A [`PipelineConfig`] is
//! built once (from defaults or JSON), validated, and then only read.

use crate::error::ScoreError;
use crate::features::FeatureKey;
use crate::heuristics::ScoringRule;
use crate::session::{Action, ActionScript};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Top-level configuration for a [`SessionScorer`](crate::SessionScorer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Expected UI actions, in order
    pub actions: ActionScript,
    pub feature_engineer: FeatureEngineerConfig,
    pub heuristics: HeuristicConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            actions: ActionScript::new(vec![
                Action::click("1", 1867.0, 19.0),
                Action::click("3", 25.0, 869.0),
            ]),
            feature_engineer: FeatureEngineerConfig::default(),
            heuristics: HeuristicConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a configuration document.
    ///
    /// Omitted sections fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ScoreError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| ScoreError::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScoreError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ScoreError> {
        self.feature_engineer.validate()?;
        self.heuristics.validate()
    }

    /// Non-fatal observations about the configuration
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.actions.click_targets().is_empty() {
            warnings.push("action script has no click targets; every session is compliant".to_string());
        }
        if self.actions.click_targets().len() < 2 {
            warnings.push("fewer than two click targets; path linearity always scores 1.0".to_string());
        }
        if self.heuristics.total_weight() == 0.0 {
            warnings.push("all metric weights are zero; suspicion is always 0".to_string());
        }
        warnings
    }
}

/// Feature extraction thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureEngineerConfig {
    /// Movement samples required before velocity and angle statistics are computed
    pub min_movements_required: usize,
    /// Per-axis pixel tolerance when matching clicks to scripted targets
    pub click_tolerance: f64,
    /// Per-axis pixel tolerance when corroborating presses with movements
    pub press_tolerance: f64,
}

impl Default for FeatureEngineerConfig {
    fn default() -> Self {
        Self {
            min_movements_required: 10,
            click_tolerance: 15.0,
            press_tolerance: 2.0,
        }
    }
}

impl FeatureEngineerConfig {
    fn validate(&self) -> Result<(), ScoreError> {
        for (name, tolerance) in [
            ("click_tolerance", self.click_tolerance),
            ("press_tolerance", self.press_tolerance),
        ] {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ScoreError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {tolerance}"
                )));
            }
        }
        Ok(())
    }
}

/// How floors inside a metric group apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorPolicy {
    /// A value below its floor saturates only its own metric
    PerMetric,
    /// Any value below its floor saturates every metric in the group
    WholeGroup,
}

/// One scored feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub feature: FeatureKey,
    pub rule: ScoringRule,
    pub weight: f64,
    /// Values strictly below this score 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
}

impl MetricEntry {
    pub fn new(feature: FeatureKey, rule: ScoringRule, weight: f64) -> Self {
        Self {
            feature,
            rule,
            weight,
            floor: None,
        }
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.floor = Some(floor);
        self
    }
}

/// A named group of scored features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricGroup {
    pub name: String,
    #[serde(default = "default_floor_policy")]
    pub floor_policy: FloorPolicy,
    pub entries: Vec<MetricEntry>,
}

fn default_floor_policy() -> FloorPolicy {
    FloorPolicy::PerMetric
}

/// A per-interval path sub-rule and its share of the interval score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSubRule {
    pub rule: ScoringRule,
    pub weight: f64,
}

/// Path linearity scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRuleConfig {
    /// Metric name in the report
    pub name: String,
    pub weight: f64,
    pub angle_std: PathSubRule,
    pub straightness: PathSubRule,
    pub angular_consistency: PathSubRule,
}

impl Default for PathRuleConfig {
    fn default() -> Self {
        Self {
            name: "checkbox_path_score".to_string(),
            weight: 3.0,
            angle_std: PathSubRule {
                rule: ScoringRule::preset(0.1, 16.8335, 0.9, 0.7, 0.91, 1.18),
                weight: 0.4,
            },
            straightness: PathSubRule {
                rule: ScoringRule::preset(0.6048, 0.99086, 0.6, 0.9, 0.8211, 1.00922431),
                weight: 0.2,
            },
            angular_consistency: PathSubRule {
                rule: ScoringRule::preset(0.84455, 0.9781, 0.8, 0.5, 0.9472, 1.02239035),
                weight: 0.4,
            },
        }
    }
}

/// Press consistency scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressRuleConfig {
    /// Metric name in the report
    pub name: String,
    pub weight: f64,
    /// Score 1.0 on any mismatch instead of the mismatch ratio
    pub binarize: bool,
}

impl Default for PressRuleConfig {
    fn default() -> Self {
        Self {
            name: FeatureKey::PressMismatchRatio.as_str().to_string(),
            weight: 3.0,
            binarize: true,
        }
    }
}

/// Heuristic analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Sessions with fewer movement samples are scored as bots outright
    pub min_movement_count: usize,
    /// Weight used for a metric whose score is exactly 0
    pub zero_score_fallback_weight: f64,
    pub groups: Vec<MetricGroup>,
    pub path: PathRuleConfig,
    pub press: PressRuleConfig,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        let velocity = ScoringRule::preset(499.75, 1799.972, 0.6, 0.4, 0.3, 1.5);
        let avg_velocity = ScoringRule::preset(389.37, 911.57, 0.6, 0.4, 0.3, 1.5);

        Self {
            min_movement_count: 50,
            zero_score_fallback_weight: 0.5,
            groups: vec![
                MetricGroup {
                    name: "velocity".to_string(),
                    floor_policy: FloorPolicy::PerMetric,
                    entries: vec![
                        MetricEntry::new(FeatureKey::VelocityStd, velocity, 0.5),
                        MetricEntry::new(FeatureKey::VelocityAvg, avg_velocity, 0.5),
                    ],
                },
                MetricGroup {
                    name: "movement_count".to_string(),
                    floor_policy: FloorPolicy::WholeGroup,
                    entries: vec![
                        MetricEntry::new(
                            FeatureKey::PixelPerMovement,
                            ScoringRule::preset(6.75, 16.862, 0.7, 0.7, 0.74, 1.0674),
                            2.0,
                        )
                        .with_floor(3.0),
                        MetricEntry::new(
                            FeatureKey::MovementCount,
                            ScoringRule::preset(250.0, 750.0, 0.6, 0.9, 0.8, 1.06),
                            1.0,
                        )
                        .with_floor(50.0),
                        MetricEntry::new(
                            FeatureKey::AngleStd,
                            ScoringRule::preset(17.523, 23.512, 0.6, 0.9, 0.856, 1.063),
                            1.0,
                        )
                        .with_floor(10.0),
                    ],
                },
                MetricGroup {
                    name: "session".to_string(),
                    floor_policy: FloorPolicy::PerMetric,
                    entries: vec![MetricEntry::new(
                        FeatureKey::SessionTime,
                        ScoringRule::preset(8.0, 15.0, 0.8, 0.5, 0.65, 1.04),
                        2.0,
                    )],
                },
            ],
            path: PathRuleConfig::default(),
            press: PressRuleConfig::default(),
        }
    }
}

impl HeuristicConfig {
    /// Sum of all top-level metric weights
    pub fn total_weight(&self) -> f64 {
        let groups: f64 = self
            .groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .map(|e| e.weight)
            .sum();
        groups + self.path.weight + self.press.weight
    }

    fn validate(&self) -> Result<(), ScoreError> {
        check_weight("zero_score_fallback_weight", self.zero_score_fallback_weight)?;
        check_weight(&self.path.name, self.path.weight)?;
        check_weight(&self.press.name, self.press.weight)?;

        for (name, sub) in [
            ("angle_std", &self.path.angle_std),
            ("straightness", &self.path.straightness),
            ("angular_consistency", &self.path.angular_consistency),
        ] {
            check_weight(name, sub.weight)?;
            sub.rule.check()?;
        }

        let mut names: HashSet<&str> = HashSet::new();
        for group in &self.groups {
            for entry in &group.entries {
                check_weight(entry.feature.as_str(), entry.weight)?;
                entry.rule.check()?;
                if let Some(floor) = entry.floor {
                    if !floor.is_finite() {
                        return Err(ScoreError::InvalidConfig(format!(
                            "floor for {} must be finite",
                            entry.feature
                        )));
                    }
                }
                if !names.insert(entry.feature.as_str()) {
                    return Err(ScoreError::InvalidConfig(format!(
                        "metric {} is configured more than once",
                        entry.feature
                    )));
                }
            }
        }
        for name in [self.path.name.as_str(), self.press.name.as_str()] {
            if !names.insert(name) {
                return Err(ScoreError::InvalidConfig(format!(
                    "metric {name} is configured more than once"
                )));
            }
        }
        Ok(())
    }
}

fn check_weight(name: &str, weight: f64) -> Result<(), ScoreError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(ScoreError::InvalidConfig(format!(
            "weight for {name} must be a non-negative number, got {weight}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert!(config.warnings().is_empty());
        assert_eq!(config.actions.click_targets().len(), 2);
        assert_eq!(config.heuristics.total_weight(), 13.0);
    }

    #[test]
    fn test_json_round_trip_preserves_defaults() {
        let config = PipelineConfig::default();
        let json = config.to_json_pretty().unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json(
            r#"{
                "actions": [{"id": "a", "type": "click", "args": {"location": {"x": 10, "y": 20}}}],
                "feature_engineer": {"click_tolerance": 5}
            }"#,
        )
        .unwrap();

        assert_eq!(config.actions.click_targets().len(), 1);
        assert_eq!(config.feature_engineer.click_tolerance, 5.0);
        assert_eq!(config.feature_engineer.min_movements_required, 10);
        assert_eq!(config.heuristics, HeuristicConfig::default());
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn test_rejects_invalid_rule() {
        let mut value = serde_json::to_value(PipelineConfig::default()).unwrap();
        value["heuristics"]["path"]["straightness"]["rule"]["normal_low"] = serde_json::json!(2.0);

        let err = PipelineConfig::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = PipelineConfig::default();
        config.heuristics.press.weight = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_metric() {
        let mut config = PipelineConfig::default();
        let duplicate = config.heuristics.groups[0].entries[0].clone();
        config.heuristics.groups[2].entries.push(duplicate);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let mut config = PipelineConfig::default();
        config.feature_engineer.press_tolerance = -2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_weights_warn() {
        let mut config = PipelineConfig::default();
        for group in &mut config.heuristics.groups {
            for entry in &mut group.entries {
                entry.weight = 0.0;
            }
        }
        config.heuristics.path.weight = 0.0;
        config.heuristics.press.weight = 0.0;

        config.validate().unwrap();
        assert!(config.warnings().iter().any(|w| w.contains("zero")));
    }
}
