//! Recorded sessions and action scripts
//!
//! Input side of the pipeline: session JSON → RawSession → time-ordered traces.

pub mod adapter;
pub mod types;

pub use adapter::{
    parse_epoch_seconds, parse_session, parse_sessions_ndjson, parse_timestamp, validate_session,
    EventIssue, EventProblem, SessionValidation,
};
pub use types::{
    Action, ActionArgs, ActionScript, ActionType, ClickTarget, Location, RawEvent, RawSession,
    RawTimestamp, Recorded, TimedPoint,
};
