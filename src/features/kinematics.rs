//! Whole-session movement statistics
//!
//! Velocity dispersion, mean velocity, direction dispersion, path density and
//! session duration. Grounded on consecutive sample pairs in time order.

use crate::features::geometry::{circular_std_degrees, mean, position_angles, std_dev, travelled_length};
use crate::features::types::{Extracted, KinematicFeatures};
use crate::session::adapter::to_sorted_trace;
use crate::session::{RawEvent, TimedPoint};
use tracing::{debug, warn};

/// Compute the kinematic features for a session.
///
/// Below `min_movements` samples the velocity and angle statistics are left at
/// zero; density and count are always computed. A malformed movement sample
/// degrades the whole record.
pub fn extract_kinematics(
    movements: &[RawEvent],
    click_count: usize,
    min_movements: usize,
) -> Extracted<KinematicFeatures> {
    let points = match to_sorted_trace(movements) {
        Ok(points) => points,
        Err(issue) => {
            warn!(%issue, "malformed movement sample, kinematics degraded");
            return Extracted::Degraded {
                value: KinematicFeatures::empty(movements.len()),
                reason: format!("mouse_movements {}", issue),
            };
        }
    };

    let mut features = KinematicFeatures::empty(points.len());
    features.pixel_per_movement = pixel_per_movement(&points, click_count);

    if points.len() < min_movements {
        debug!(
            movements = points.len(),
            required = min_movements,
            "too few movements for velocity statistics"
        );
        return Extracted::Computed(features);
    }

    let velocities = step_velocities(&points);
    features.velocity_std = std_dev(&velocities);
    features.velocity_avg = mean(&velocities);
    features.angle_std = circular_std_degrees(&position_angles(&points));

    Extracted::Computed(features)
}

/// Distance over elapsed time for each consecutive pair; 0 when no time elapsed
pub fn step_velocities(points: &[TimedPoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| {
            let dt = w[1].seconds_since(&w[0]);
            if dt > 0.0 {
                w[0].distance_to(&w[1]) / dt
            } else {
                0.0
            }
        })
        .collect()
}

/// Total travelled length over sample count.
///
/// Zero when there are at least as many clicks as movement samples.
pub fn pixel_per_movement(points: &[TimedPoint], click_count: usize) -> f64 {
    if points.is_empty() || click_count >= points.len() {
        return 0.0;
    }
    travelled_length(points) / points.len() as f64
}

/// Seconds between the first and last movement sample
pub fn extract_session_time(movements: &[RawEvent]) -> Extracted<f64> {
    match to_sorted_trace(movements) {
        Ok(points) => {
            let seconds = match (points.first(), points.last()) {
                (Some(first), Some(last)) => last.seconds_since(first),
                _ => 0.0,
            };
            Extracted::Computed(seconds)
        }
        Err(issue) => {
            warn!(%issue, "malformed movement sample, session time degraded");
            Extracted::Degraded {
                value: 0.0,
                reason: format!("mouse_movements {}", issue),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Recorded;
    use chrono::{Duration, TimeZone, Utc};

    fn movements(coords: &[(f64, f64)], step_ms: i64) -> Vec<RawEvent> {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let at = start + Duration::milliseconds(i as i64 * step_ms);
                RawEvent::new(x, y, at.to_rfc3339())
            })
            .collect()
    }

    #[test]
    fn test_constant_velocity_has_zero_dispersion() {
        let coords: Vec<(f64, f64)> = (0..20).map(|i| (100.0 + i as f64 * 10.0, 200.0)).collect();
        let result = extract_kinematics(&movements(&coords, 100), 0, 10);

        let k = result.value();
        assert!(!result.is_degraded());
        assert_eq!(k.movement_count, 20);
        assert!((k.velocity_avg - 100.0).abs() < 1e-9);
        assert!(k.velocity_std < 1e-9);
        // 19 steps of 10px over 20 samples
        assert!((k.pixel_per_movement - 9.5).abs() < 1e-9);
    }

    #[test]
    fn test_below_minimum_skips_velocity() {
        let coords: Vec<(f64, f64)> = (0..5).map(|i| (i as f64 * 10.0, 0.0)).collect();
        let result = extract_kinematics(&movements(&coords, 100), 0, 10);

        let k = result.value();
        assert_eq!(k.movement_count, 5);
        assert_eq!(k.velocity_avg, 0.0);
        assert_eq!(k.velocity_std, 0.0);
        assert_eq!(k.angle_std, 0.0);
        assert!(k.pixel_per_movement > 0.0);
    }

    #[test]
    fn test_density_zero_when_clicks_outnumber_movements() {
        let coords: Vec<(f64, f64)> = (0..3).map(|i| (i as f64 * 10.0, 0.0)).collect();
        let result = extract_kinematics(&movements(&coords, 100), 3, 0);
        assert_eq!(result.value().pixel_per_movement, 0.0);
    }

    #[test]
    fn test_same_timestamp_contributes_zero_velocity() {
        let mut events = movements(&[(0.0, 0.0), (10.0, 0.0)], 100);
        let mut repeat = events[1].clone();
        repeat.x = Some(Recorded::Valid(50.0));
        events.push(repeat);

        let velocities = step_velocities(&to_sorted_trace(&events).unwrap());
        assert_eq!(velocities.len(), 2);
        assert!(velocities.iter().all(|v| v.is_finite()));
        assert!(velocities.contains(&0.0));
    }

    #[test]
    fn test_malformed_movement_degrades() {
        let mut events = movements(&[(0.0, 0.0), (10.0, 0.0)], 100);
        events.push(RawEvent {
            x: Some(Recorded::Valid(3.0)),
            y: None,
            timestamp: Some("2024-01-15T14:00:01Z".into()),
        });

        let result = extract_kinematics(&events, 0, 0);
        assert!(result.is_degraded());
        assert_eq!(result.value().movement_count, 3);
        assert!(extract_session_time(&events).is_degraded());
    }

    #[test]
    fn test_session_time() {
        let events = movements(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)], 1500);
        assert!((*extract_session_time(&events).value() - 3.0).abs() < 1e-9);
        assert_eq!(*extract_session_time(&[]).value(), 0.0);
    }
}
