//! Report encoding
//!
//! Shapes analysis results and stage failures into the exported JSON reports.

use crate::error::ScoreError;
use crate::heuristics::{AnalysisOutcome, AnalysisResult, MetricScore};
use crate::session::RawSession;
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocessing,
    Heuristics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preprocessing => f.write_str("preprocessing"),
            Stage::Heuristics => f.write_str("heuristics"),
        }
    }
}

/// Producer metadata embedded in every success report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Analysis section of a success report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAnalysis {
    /// Human-likeness in [0, 1]; 0.0 is maximally bot-like
    pub score: f64,
    pub suspicion: f64,
    pub outcome: AnalysisOutcome,
    pub metrics: BTreeMap<String, MetricScore>,
}

/// Exported report for a scored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub analysis: ReportAnalysis,
    pub producer: Producer,
    pub computed_at_utc: String,
}

/// Exported report for a session that could not be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    pub success: bool,
    pub stage: Stage,
    pub error: String,
}

/// Encoder for exported reports
#[derive(Debug, Clone)]
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build the success report, echoing the session's identifiers
    pub fn encode_success(&self, session: &RawSession, analysis: AnalysisResult) -> ScoreReport {
        ScoreReport {
            success: true,
            project_id: session.project_id.clone(),
            user_id: session.user_id.clone(),
            session_id: session.session_id.clone(),
            analysis: ReportAnalysis {
                score: analysis.score,
                suspicion: analysis.suspicion,
                outcome: analysis.outcome,
                metrics: analysis.metrics,
            },
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
        }
    }

    pub fn encode_failure(&self, stage: Stage, error: &ScoreError) -> FailureReport {
        FailureReport {
            success: false,
            stage,
            error: error.to_string(),
        }
    }
}
