//! Small numeric helpers shared by the extractors

use crate::session::TimedPoint;
use std::f64::consts::PI;

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, 0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Circular standard deviation in degrees.
///
/// `sqrt(-2 ln R)` where `R` is the mean resultant length of the unit vectors.
pub fn circular_std_degrees(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let n = angles.len() as f64;
    let sin = angles.iter().map(|a| a.sin()).sum::<f64>() / n;
    let cos = angles.iter().map(|a| a.cos()).sum::<f64>() / n;
    let r = sin.hypot(cos).clamp(f64::MIN_POSITIVE, 1.0);
    (-2.0 * r.ln()).sqrt().to_degrees()
}

/// Direction of each point's position vector, `atan2(y, x)`
pub fn position_angles(points: &[TimedPoint]) -> Vec<f64> {
    points.iter().map(|p| p.y.atan2(p.x)).collect()
}

/// Absolute turning angles (radians, `[0, π]`) at every interior point.
///
/// Triples where either step has zero length carry no direction and are skipped.
pub fn turning_angles(points: &[TimedPoint]) -> Vec<f64> {
    points
        .windows(3)
        .filter_map(|w| {
            let (ax, ay) = (w[1].x - w[0].x, w[1].y - w[0].y);
            let (bx, by) = (w[2].x - w[1].x, w[2].y - w[1].y);
            let norms = ax.hypot(ay) * bx.hypot(by);
            if norms <= 0.0 {
                return None;
            }
            let cos = ((ax * bx + ay * by) / norms).clamp(-1.0, 1.0);
            Some(cos.acos())
        })
        .collect()
}

/// Sum of step lengths along a trace
pub fn travelled_length(points: &[TimedPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Normalize an angle in `[0, π]` to `[0, 1]`
pub fn normalize_angle(angle: f64) -> f64 {
    angle / PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn trace(coords: &[(f64, f64)]) -> Vec<TimedPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| TimedPoint {
                x,
                y,
                at: start + Duration::milliseconds(i as i64 * 10),
            })
            .collect()
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_circular_std() {
        assert_eq!(circular_std_degrees(&[]), 0.0);
        assert!(circular_std_degrees(&[0.3, 0.3, 0.3]) < 1e-6);

        // Angles either side of the ±π seam are close, not far apart
        let seam = circular_std_degrees(&[PI - 0.01, -PI + 0.01]);
        assert!(seam < 1.0);

        let spread = circular_std_degrees(&[0.0, PI / 2.0, PI, -PI / 2.0]);
        assert!(spread > 90.0);
        assert!(spread.is_finite());
    }

    #[test]
    fn test_turning_angles() {
        let straight = trace(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(turning_angles(&straight), vec![0.0]);

        let right_angle = trace(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
        let angles = turning_angles(&right_angle);
        assert!((angles[0] - PI / 2.0).abs() < 1e-12);

        let reversal = trace(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!((turning_angles(&reversal)[0] - PI).abs() < 1e-12);

        let stalled = trace(&[(0.0, 0.0), (0.0, 0.0), (1.0, 0.0)]);
        assert!(turning_angles(&stalled).is_empty());
    }

    #[test]
    fn test_travelled_length() {
        let points = trace(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((travelled_length(&points) - 11.0).abs() < 1e-12);
    }
}
