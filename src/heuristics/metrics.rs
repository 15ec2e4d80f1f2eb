//! Table-driven metric groups
//!
//! Each configured [`MetricGroup`] maps feature values to suspicion scores
//! through its entries' scoring rules. Floors short-circuit values that are
//! implausibly low, either per metric or for the whole group.

use crate::config::{FloorPolicy, MetricEntry, MetricGroup, PressRuleConfig};
use crate::features::{Extracted, PressConsistency, SessionFeatures};
use tracing::debug;

/// Score every entry of a group, in configuration order
pub fn evaluate_group(group: &MetricGroup, features: &SessionFeatures) -> Vec<(String, f64)> {
    let values: Vec<Extracted<f64>> = group
        .entries
        .iter()
        .map(|entry| features.scalar(entry.feature))
        .collect();

    let below: Vec<bool> = group
        .entries
        .iter()
        .zip(&values)
        .map(|(entry, value)| below_floor(entry, *value.value()))
        .collect();

    let group_saturated = group.floor_policy == FloorPolicy::WholeGroup && below.iter().any(|b| *b);
    if group_saturated {
        debug!(group = %group.name, "value below floor, group saturated");
    }

    group
        .entries
        .iter()
        .zip(values)
        .zip(below)
        .map(|((entry, value), below)| {
            let score = match value {
                Extracted::Degraded { .. } => 1.0,
                Extracted::Computed(_) if group_saturated || below => 1.0,
                Extracted::Computed(v) => entry.rule.score(v),
            };
            (entry.feature.as_str().to_string(), score)
        })
        .collect()
}

fn below_floor(entry: &MetricEntry, value: f64) -> bool {
    entry.floor.is_some_and(|floor| value < floor)
}

/// Suspicion from press consistency
pub fn score_press(config: &PressRuleConfig, press: &Extracted<PressConsistency>) -> f64 {
    match press {
        Extracted::Degraded { .. } => 1.0,
        Extracted::Computed(p) if config.binarize => {
            if p.mismatched > 0 {
                1.0
            } else {
                0.0
            }
        }
        Extracted::Computed(p) => p.mismatch_ratio.clamp(0.0, 1.0),
    }
}
