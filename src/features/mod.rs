//! Feature Engineer
//!
//! Turns a raw session into a [`SessionFeatures`] record. Each sub-extractor
//! runs independently and degrades on its own: a malformed click affects
//! compliance and the path intervals it would have bounded, a malformed
//! movement sample only the movement-derived features.

pub mod geometry;
pub mod kinematics;
pub mod linearity;
pub mod matcher;
pub mod press;
pub mod types;

pub use linearity::MIN_PATH_POINTS;
pub use matcher::ClickMatcher;
pub use types::{
    ClickCompliance, Extracted, FeatureKey, IntervalLinearity, KinematicFeatures, MatchedClick,
    PathFeatures, PressConsistency, SessionFeatures,
};

use crate::config::FeatureEngineerConfig;
use crate::error::ScoreError;
use crate::session::{ActionScript, RawSession};
use tracing::{debug, warn};

/// Extracts the feature record for a session
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureEngineerConfig,
    script: ActionScript,
    matcher: ClickMatcher,
}

impl FeatureEngineer {
    pub fn new(config: FeatureEngineerConfig, script: ActionScript) -> Self {
        let matcher = ClickMatcher::new(config.click_tolerance);
        Self {
            config,
            script,
            matcher,
        }
    }

    pub fn config(&self) -> &FeatureEngineerConfig {
        &self.config
    }

    pub fn script(&self) -> &ActionScript {
        &self.script
    }

    /// Derive all features for a session.
    ///
    /// Fails only when every sub-extractor degraded, leaving nothing observed.
    pub fn extract(&self, session: &RawSession) -> Result<SessionFeatures, ScoreError> {
        let compliance = self.matcher.match_clicks(&session.mouse_clicks, &self.script);
        let kinematics = kinematics::extract_kinematics(
            &session.mouse_movements,
            session.mouse_clicks.len(),
            self.config.min_movements_required,
        );
        let paths = match &compliance {
            Extracted::Computed(matched) => linearity::extract_paths(&session.mouse_movements, matched),
            Extracted::Degraded { reason, .. } => Extracted::Degraded {
                value: PathFeatures::invalid(),
                reason: format!("click boundaries unavailable ({reason})"),
            },
        };
        let press = press::check_press_consistency(
            &session.mouse_down,
            &session.mouse_movements,
            self.config.press_tolerance,
        );
        let session_time = kinematics::extract_session_time(&session.mouse_movements);

        let features = SessionFeatures {
            compliance,
            kinematics,
            paths,
            press,
            session_time,
            click_count: session.mouse_clicks.len(),
        };

        let degraded = features.degradations();
        if features.all_degraded() {
            let reasons: Vec<String> = degraded
                .iter()
                .map(|(name, reason)| format!("{name}: {reason}"))
                .collect();
            return Err(ScoreError::NoUsableFeatures(reasons.join("; ")));
        }
        for (name, reason) in &degraded {
            warn!(extractor = *name, %reason, "feature extractor degraded");
        }

        debug!(
            movements = features.movement_count(),
            clicks = features.click_count,
            compliant = features.is_compliant(),
            intervals = features.paths.value().intervals.len(),
            "features extracted"
        );
        Ok(features)
    }
}
