//! Heuristic Analyzer
//!
//! Turns a feature record into per-metric suspicion scores and a weighted
//! aggregate. Two gates run first and short-circuit to a maximally suspicious
//! result: scripted-click non-compliance, then too few movement samples.

pub mod metrics;
pub mod path;
pub mod scoring;
pub mod types;

pub use scoring::{round5, ScoringRule};
pub use types::{AnalysisOutcome, AnalysisResult, MetricScore, BOT_BEHAVIOR_METRIC};

use crate::config::HeuristicConfig;
use crate::error::ScoreError;
use crate::features::SessionFeatures;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Scores a feature record against the configured rules
#[derive(Debug, Clone)]
pub struct HeuristicAnalyzer {
    config: HeuristicConfig,
}

impl HeuristicAnalyzer {
    pub fn new(config: HeuristicConfig) -> Self {
        if config.total_weight() == 0.0 {
            warn!("all metric weights are zero; suspicion will always be 0");
        }
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Analyze one session's features
    pub fn analyze(&self, features: &SessionFeatures) -> Result<AnalysisResult, ScoreError> {
        if !features.is_compliant() {
            info!("session does not follow the action script");
            return Ok(AnalysisResult::bot(AnalysisOutcome::NonCompliant));
        }

        let movements = features.movement_count();
        if movements < self.config.min_movement_count {
            info!(
                movements,
                required = self.config.min_movement_count,
                "too few mouse movements"
            );
            return Ok(AnalysisResult::bot(AnalysisOutcome::InsufficientMovement));
        }

        let metrics = self.score_metrics(features);
        let suspicion = aggregate(&metrics)?;
        debug!(?metrics, suspicion, "session analyzed");

        Ok(AnalysisResult {
            score: round5(1.0 - suspicion),
            suspicion: round5(suspicion),
            metrics,
            outcome: AnalysisOutcome::Evaluated,
        })
    }

    /// Per-metric scores with the weights used for aggregation
    fn score_metrics(&self, features: &SessionFeatures) -> BTreeMap<String, MetricScore> {
        let mut scored = BTreeMap::new();

        for group in &self.config.groups {
            let scores = metrics::evaluate_group(group, features);
            for (entry, (name, score)) in group.entries.iter().zip(scores) {
                scored.insert(name, self.weighted(score, entry.weight));
            }
        }

        let path_rule = &self.config.path;
        let path_score = path::score_paths(path_rule, &features.paths);
        scored.insert(path_rule.name.clone(), self.weighted(path_score, path_rule.weight));

        let press_rule = &self.config.press;
        let press_score = metrics::score_press(press_rule, &features.press);
        scored.insert(press_rule.name.clone(), self.weighted(press_score, press_rule.weight));

        scored
    }

    /// A zero score carries the fallback weight instead of its configured one
    fn weighted(&self, score: f64, weight: f64) -> MetricScore {
        let weight = if score == 0.0 {
            self.config.zero_score_fallback_weight
        } else {
            weight
        };
        MetricScore { score, weight }
    }
}

/// Weighted mean of metric scores.
///
/// A zero total weight yields 0. Fails if the result is not a finite number.
pub fn aggregate(metrics: &BTreeMap<String, MetricScore>) -> Result<f64, ScoreError> {
    let (weighted, total) = metrics
        .values()
        .fold((0.0, 0.0), |(sum, total), m| (sum + m.score * m.weight, total + m.weight));

    if total == 0.0 {
        warn!("total metric weight is zero, defaulting suspicion to 0");
        return Ok(0.0);
    }

    let suspicion = weighted / total;
    if !suspicion.is_finite() {
        return Err(ScoreError::AggregationError(format!(
            "weighted mean is {suspicion} (sum {weighted}, total weight {total})"
        )));
    }
    Ok(suspicion)
}
