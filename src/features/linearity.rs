//! Inter-click path linearity
//!
//! Movement between two consecutive matched clicks is measured for
//! straightness, turning behaviour and direction dispersion. Scripted cursors
//! tend to travel in perfectly straight lines; human paths curve and wobble.

use crate::features::geometry::{
    circular_std_degrees, mean, normalize_angle, position_angles, travelled_length, turning_angles,
};
use crate::features::types::{ClickCompliance, Extracted, IntervalLinearity, PathFeatures};
use crate::session::adapter::to_sorted_trace;
use crate::session::{RawEvent, TimedPoint};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Fewest points an interval needs before its linearity is measured
pub const MIN_PATH_POINTS: usize = 5;

/// Travelled lengths below this are treated as no movement
const MIN_TRAVEL: f64 = 1e-10;

/// Measure path linearity between every pair of consecutive matched clicks
pub fn extract_paths(movements: &[RawEvent], compliance: &ClickCompliance) -> Extracted<PathFeatures> {
    let boundaries = compliance.boundaries();
    if boundaries.len() < 2 {
        debug!(boundaries = boundaries.len(), "no inter-click intervals to measure");
        return Extracted::Computed(PathFeatures::invalid());
    }

    let points = match to_sorted_trace(movements) {
        Ok(points) => points,
        Err(issue) => {
            warn!(%issue, "malformed movement sample, path linearity degraded");
            return Extracted::Degraded {
                value: PathFeatures::invalid(),
                reason: format!("mouse_movements {}", issue),
            };
        }
    };

    let intervals: Vec<IntervalLinearity> = boundaries
        .windows(2)
        .map(|w| interval_linearity(&points, w[0], w[1]))
        .collect();

    Extracted::Computed(PathFeatures {
        valid: !intervals.is_empty(),
        intervals,
    })
}

/// Linearity of the samples strictly between `start` and `end`
pub fn interval_linearity(points: &[TimedPoint], start: DateTime<Utc>, end: DateTime<Utc>) -> IntervalLinearity {
    let inside: Vec<TimedPoint> = points
        .iter()
        .filter(|p| p.at > start && p.at < end)
        .copied()
        .collect();

    let mut linearity = path_linearity(&inside);
    linearity.start = start;
    linearity.end = end;
    linearity
}

/// Linearity of an ordered trace.
///
/// Traces shorter than [`MIN_PATH_POINTS`], or with no travelled length, get
/// the maximally linear default and are flagged degenerate.
pub fn path_linearity(points: &[TimedPoint]) -> IntervalLinearity {
    let (start, end) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.at, last.at),
        _ => (DateTime::<Utc>::default(), DateTime::<Utc>::default()),
    };

    let travelled = travelled_length(points);
    if points.len() < MIN_PATH_POINTS || travelled < MIN_TRAVEL {
        return maximally_linear(start, end, points.len());
    }

    let chord = points[0].distance_to(&points[points.len() - 1]);
    let turning = turning_angles(points);
    let avg_turning = if turning.is_empty() {
        0.0
    } else {
        normalize_angle(mean(&turning))
    };

    IntervalLinearity {
        start,
        end,
        point_count: points.len(),
        straightness: chord / travelled,
        angular_consistency: 1.0 - avg_turning,
        avg_turning_angle: avg_turning,
        angle_std: circular_std_degrees(&position_angles(points)),
        degenerate: false,
    }
}

fn maximally_linear(start: DateTime<Utc>, end: DateTime<Utc>, point_count: usize) -> IntervalLinearity {
    IntervalLinearity {
        start,
        end,
        point_count,
        straightness: 1.0,
        angular_consistency: 1.0,
        avg_turning_angle: 0.0,
        angle_std: 0.0,
        degenerate: true,
    }
}
