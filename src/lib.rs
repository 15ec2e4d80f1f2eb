//! botscore - Heuristic bot-likeness scoring for recorded pointer sessions
//!
//! botscore scores a recorded mouse session against an expected action script
//! through a deterministic pipeline: session parsing → feature engineering →
//! heuristic analysis → report encoding.
//!
//! ## Modules
//!
//! - **Session**: Raw session records, action scripts and timestamp parsing
//! - **Features**: Click compliance, kinematics, path linearity, press consistency
//! - **Heuristics**: Piecewise-linear scoring rules, metric groups and aggregation

pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod heuristics;
pub mod pipeline;
pub mod session;

pub use config::{FeatureEngineerConfig, HeuristicConfig, PipelineConfig};
pub use encoder::{FailureReport, ReportEncoder, ScoreReport, Stage};
pub use error::ScoreError;
pub use features::{Extracted, FeatureEngineer, FeatureKey, SessionFeatures};
pub use heuristics::{AnalysisOutcome, AnalysisResult, HeuristicAnalyzer, MetricScore, ScoringRule};
pub use pipeline::{score_session, PipelineOutcome, SessionScorer};
pub use session::{parse_session, validate_session, ActionScript, RawEvent, RawSession};

/// Version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "botscore";
