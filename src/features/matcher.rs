//! Click compliance
//!
//! Matches recorded clicks against the scripted click targets. Matching is
//! greedy in script order: each target takes the earliest still-unmatched
//! click within tolerance on both axes.

use crate::features::types::{ClickCompliance, Extracted, MatchedClick};
use crate::session::adapter::to_sorted_trace;
use crate::session::{ActionScript, RawEvent};
use tracing::{debug, warn};

/// Matches recorded clicks to scripted click targets
#[derive(Debug, Clone)]
pub struct ClickMatcher {
    tolerance: f64,
}

impl ClickMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Decide whether the recorded clicks satisfy the script.
    ///
    /// Compliant only when every target is matched and the matched clicks
    /// occur in script order. A malformed click degrades to non-compliant.
    pub fn match_clicks(&self, clicks: &[RawEvent], script: &ActionScript) -> Extracted<ClickCompliance> {
        let targets = script.click_targets();

        let clicks = match to_sorted_trace(clicks) {
            Ok(points) => points,
            Err(issue) => {
                warn!(%issue, "malformed click, treating session as non-compliant");
                return Extracted::Degraded {
                    value: ClickCompliance::non_compliant(targets.len()),
                    reason: format!("mouse_clicks {}", issue),
                };
            }
        };

        let mut consumed = vec![false; clicks.len()];
        let mut matched = Vec::with_capacity(targets.len());

        for target in &targets {
            let hit = clicks
                .iter()
                .enumerate()
                .find(|(i, c)| !consumed[*i] && c.within(target.x, target.y, self.tolerance));

            match hit {
                Some((i, click)) => {
                    consumed[i] = true;
                    matched.push(MatchedClick {
                        action_id: target.action_id.clone(),
                        x: click.x,
                        y: click.y,
                        at: click.at,
                    });
                }
                None => debug!(
                    action_id = %target.action_id,
                    x = target.x,
                    y = target.y,
                    "no recorded click near scripted target"
                ),
            }
        }

        let all_matched = matched.len() == targets.len();
        let in_order = matched.windows(2).all(|w| w[0].at < w[1].at);
        if all_matched && !in_order {
            debug!("scripted clicks matched out of order");
        }

        Extracted::Computed(ClickCompliance {
            compliant: all_matched && in_order,
            expected: targets.len(),
            matched,
        })
    }
}
