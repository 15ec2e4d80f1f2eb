//! Press consistency
//!
//! A real pointer moves to where it presses. Each press event is checked
//! against the nearest-in-time movement sample; presses with no movement
//! sample nearby are counted as mismatches.

use crate::features::types::{Extracted, PressConsistency};
use crate::session::adapter::to_sorted_trace;
use crate::session::{RawEvent, TimedPoint};
use tracing::{trace, warn};

/// Check every press against the movement trace
pub fn check_press_consistency(
    presses: &[RawEvent],
    movements: &[RawEvent],
    tolerance: f64,
) -> Extracted<PressConsistency> {
    let parsed = to_sorted_trace(presses)
        .map_err(|issue| format!("mouse_down {}", issue))
        .and_then(|presses| {
            to_sorted_trace(movements)
                .map(|movements| (presses, movements))
                .map_err(|issue| format!("mouse_movements {}", issue))
        });

    let (presses, movements) = match parsed {
        Ok(traces) => traces,
        Err(reason) => {
            warn!(%reason, "press consistency degraded");
            return Extracted::Degraded {
                value: PressConsistency::all_mismatched(presses.len()),
                reason,
            };
        }
    };

    if presses.is_empty() {
        return Extracted::Computed(PressConsistency {
            press_count: 0,
            mismatched: 0,
            mismatch_ratio: 0.0,
        });
    }

    let mismatched = presses
        .iter()
        .filter(|press| !is_corroborated(press, &movements, tolerance))
        .count();

    Extracted::Computed(PressConsistency {
        press_count: presses.len(),
        mismatched,
        mismatch_ratio: mismatched as f64 / presses.len() as f64,
    })
}

/// Whether the first movement at or after the press (or the last one before
/// it, if none follow) lies within tolerance of the press location
fn is_corroborated(press: &TimedPoint, movements: &[TimedPoint], tolerance: f64) -> bool {
    let idx = movements.partition_point(|m| m.at < press.at);
    let candidate = movements.get(idx).or_else(|| movements.last());

    match candidate {
        Some(m) => {
            let hit = m.within(press.x, press.y, tolerance);
            trace!(
                press_x = press.x,
                press_y = press.y,
                move_x = m.x,
                move_y = m.y,
                hit,
                "press lookup"
            );
            hit
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Recorded;

    fn movements() -> Vec<RawEvent> {
        vec![
            RawEvent::new(100.0, 100.0, "2024-01-15T14:00:00.000Z"),
            RawEvent::new(150.0, 120.0, "2024-01-15T14:00:00.500Z"),
            RawEvent::new(200.0, 140.0, "2024-01-15T14:00:01.000Z"),
        ]
    }

    #[test]
    fn test_corroborated_presses() {
        let presses = vec![
            RawEvent::new(151.0, 121.0, "2024-01-15T14:00:00.400Z"),
            RawEvent::new(200.0, 140.0, "2024-01-15T14:00:01.000Z"),
        ];

        let result = check_press_consistency(&presses, &movements(), 2.0);
        assert_eq!(result.value().mismatched, 0);
        assert_eq!(result.value().mismatch_ratio, 0.0);
    }

    #[test]
    fn test_teleporting_press_is_mismatch() {
        let presses = vec![
            RawEvent::new(151.0, 121.0, "2024-01-15T14:00:00.400Z"),
            RawEvent::new(900.0, 700.0, "2024-01-15T14:00:00.700Z"),
        ];

        let result = check_press_consistency(&presses, &movements(), 2.0);
        assert_eq!(result.value().press_count, 2);
        assert_eq!(result.value().mismatched, 1);
        assert_eq!(result.value().mismatch_ratio, 0.5);
    }

    #[test]
    fn test_press_after_last_movement_uses_last_sample() {
        let presses = vec![RawEvent::new(201.0, 139.0, "2024-01-15T14:00:05.000Z")];
        let result = check_press_consistency(&presses, &movements(), 2.0);
        assert_eq!(result.value().mismatched, 0);
    }

    #[test]
    fn test_no_movements_is_mismatch() {
        let presses = vec![RawEvent::new(10.0, 10.0, "2024-01-15T14:00:00Z")];
        let result = check_press_consistency(&presses, &[], 2.0);
        assert_eq!(result.value().mismatch_ratio, 1.0);
    }

    #[test]
    fn test_no_presses() {
        let result = check_press_consistency(&[], &movements(), 2.0);
        assert!(!result.is_degraded());
        assert_eq!(result.value().mismatch_ratio, 0.0);
    }

    #[test]
    fn test_malformed_press_degrades() {
        let presses = vec![RawEvent {
            x: Some(Recorded::Valid(1.0)),
            y: Some(Recorded::Valid(1.0)),
            timestamp: None,
        }];
        let result = check_press_consistency(&presses, &movements(), 2.0);
        assert!(result.is_degraded());
        assert_eq!(result.value().mismatch_ratio, 1.0);
    }
}
