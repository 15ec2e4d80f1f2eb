//! Pipeline orchestration
//!
//! This module provides the public API for botscore.
//! It runs a session through the full pipeline, from session JSON to report.

use crate::config::PipelineConfig;
use crate::encoder::{FailureReport, ReportEncoder, ScoreReport, Stage};
use crate::error::ScoreError;
use crate::features::{FeatureEngineer, SessionFeatures};
use crate::heuristics::HeuristicAnalyzer;
use crate::session::{parse_session, RawSession};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Score one session JSON document with the default configuration.
///
/// # Arguments
/// * `session_json` - Recorded session (movements, clicks, presses)
///
/// # Returns
/// The report JSON: a success report, or `{success: false, stage, error}`
///
/// # Example
/// ```ignore
/// let report = score_session(&session_json)?;
/// ```
pub fn score_session(session_json: &str) -> Result<String, ScoreError> {
    SessionScorer::default().score_json(session_json).to_json()
}

/// Result of running a session through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Scored(ScoreReport),
    Failed(FailureReport),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Scored(_))
    }

    /// Human-likeness score, if the session was scored
    pub fn score(&self) -> Option<f64> {
        match self {
            PipelineOutcome::Scored(report) => Some(report.analysis.score),
            PipelineOutcome::Failed(_) => None,
        }
    }

    pub fn to_json(&self) -> Result<String, ScoreError> {
        serde_json::to_string(self).map_err(|e| ScoreError::EncodingError(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, ScoreError> {
        serde_json::to_string_pretty(self).map_err(|e| ScoreError::EncodingError(e.to_string()))
    }
}

/// Reusable scorer holding a validated configuration.
///
/// Immutable after construction and safe to share across threads.
///
/// Pipeline stages:
/// 1. FeatureEngineer - Extract the feature record (preprocessing)
/// 2. HeuristicAnalyzer - Score features and aggregate (heuristics)
/// 3. ReportEncoder - Shape the exported report
#[derive(Debug, Clone)]
pub struct SessionScorer {
    engineer: FeatureEngineer,
    analyzer: HeuristicAnalyzer,
    encoder: ReportEncoder,
}

impl Default for SessionScorer {
    fn default() -> Self {
        Self::from_valid(PipelineConfig::default())
    }
}

impl SessionScorer {
    /// Create a scorer, validating the configuration once
    pub fn new(config: PipelineConfig) -> Result<Self, ScoreError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: PipelineConfig) -> Self {
        let PipelineConfig {
            actions,
            feature_engineer,
            heuristics,
        } = config;
        Self {
            engineer: FeatureEngineer::new(feature_engineer, actions),
            analyzer: HeuristicAnalyzer::new(heuristics),
            encoder: ReportEncoder::new(),
        }
    }

    /// Use a fixed producer instance ID in reports
    pub fn with_instance_id(mut self, instance_id: String) -> Self {
        self.encoder = ReportEncoder::with_instance_id(instance_id);
        self
    }

    pub fn instance_id(&self) -> &str {
        self.encoder.instance_id()
    }

    /// Run only the feature engineering stage
    pub fn extract_features(&self, session: &RawSession) -> Result<SessionFeatures, ScoreError> {
        self.engineer.extract(session)
    }

    /// Score a parsed session
    pub fn score(&self, session: &RawSession) -> PipelineOutcome {
        let features = match self.engineer.extract(session) {
            Ok(features) => features,
            Err(e) => return self.fail(Stage::Preprocessing, &e),
        };

        let analysis = match self.analyzer.analyze(&features) {
            Ok(analysis) => analysis,
            Err(e) => return self.fail(Stage::Heuristics, &e),
        };

        debug!(
            session_id = session.session_id.as_deref().unwrap_or("-"),
            score = analysis.score,
            outcome = ?analysis.outcome,
            "session scored"
        );
        PipelineOutcome::Scored(self.encoder.encode_success(session, analysis))
    }

    /// Parse and score a session JSON document
    pub fn score_json(&self, session_json: &str) -> PipelineOutcome {
        match parse_session(session_json) {
            Ok(session) => self.score(&session),
            Err(e) => self.fail(Stage::Preprocessing, &e),
        }
    }

    fn fail(&self, stage: Stage, err: &ScoreError) -> PipelineOutcome {
        error!(%stage, error = %err, "session could not be scored");
        PipelineOutcome::Failed(self.encoder.encode_failure(stage, err))
    }
}
