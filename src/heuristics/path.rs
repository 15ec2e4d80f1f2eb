//! Path linearity analysis
//!
//! Scores each inter-click interval from its angular dispersion, straightness
//! and angular consistency, and keeps the most suspicious interval.

use crate::config::PathRuleConfig;
use crate::features::{Extracted, IntervalLinearity, PathFeatures};
use tracing::debug;

/// Distance from a sentinel value still treated as hitting it
const SENTINEL_TOLERANCE: f64 = 1e-9;

/// Suspicion for the whole set of inter-click paths.
///
/// 1.0 when the features degraded, no interval exists, or any interval looks
/// machine-generated.
pub fn score_paths(config: &PathRuleConfig, paths: &Extracted<PathFeatures>) -> f64 {
    let paths = match paths {
        Extracted::Computed(paths) => paths,
        Extracted::Degraded { .. } => return 1.0,
    };
    if !paths.valid || paths.intervals.is_empty() {
        return 1.0;
    }

    paths
        .intervals
        .iter()
        .map(|interval| score_interval(config, interval))
        .fold(0.0, f64::max)
}

/// Suspicion for one interval
pub fn score_interval(config: &PathRuleConfig, interval: &IntervalLinearity) -> f64 {
    if is_machine_path(interval) {
        debug!(
            start = %interval.start,
            points = interval.point_count,
            degenerate = interval.degenerate,
            "interval has a perfectly linear path"
        );
        return 1.0;
    }

    let score = config.angle_std.weight * config.angle_std.rule.score(interval.angle_std)
        + config.straightness.weight * config.straightness.rule.score(interval.straightness)
        + config.angular_consistency.weight
            * config.angular_consistency.rule.score(interval.angular_consistency);
    score.min(1.0)
}

/// Sentinels that only synthetic cursors produce, up to float noise
fn is_machine_path(interval: &IntervalLinearity) -> bool {
    let hits = |value: f64, sentinel: f64| (value - sentinel).abs() <= SENTINEL_TOLERANCE;
    interval.degenerate
        || hits(interval.straightness, 1.0)
        || hits(interval.angle_std, 0.0)
        || hits(interval.angular_consistency, 1.0)
}
