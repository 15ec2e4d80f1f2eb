//! Analysis result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric name reported when a gate short-circuits the analysis
pub const BOT_BEHAVIOR_METRIC: &str = "bot_behavior";

/// A metric's suspicion score and the weight it carried in aggregation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Suspicion in [0, 1]; 1.0 is bot-like
    pub score: f64,
    pub weight: f64,
}

/// Which path through the analyzer produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Scripted clicks were missing or out of order
    NonCompliant,
    /// Too few movement samples to judge
    InsufficientMovement,
    /// Every metric was scored and aggregated
    Evaluated,
}

/// Result of heuristic analysis for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Human-likeness, `1 - suspicion`, rounded to 5 decimals
    pub score: f64,
    /// Weighted mean of metric suspicion, rounded to 5 decimals
    pub suspicion: f64,
    pub metrics: BTreeMap<String, MetricScore>,
    pub outcome: AnalysisOutcome,
}

impl AnalysisResult {
    /// Maximally suspicious result for a short-circuited session
    pub fn bot(outcome: AnalysisOutcome) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            BOT_BEHAVIOR_METRIC.to_string(),
            MetricScore {
                score: 1.0,
                weight: 1.0,
            },
        );
        Self {
            score: 0.0,
            suspicion: 1.0,
            metrics,
            outcome,
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        self.outcome != AnalysisOutcome::Evaluated
    }
}
