//! Session adapter
//!
//! Parses session JSON, converts raw events into time-ordered points and
//! reports malformed events.

use crate::error::ScoreError;
use crate::session::types::{RawEvent, RawSession, RawTimestamp, Recorded, TimedPoint};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Naive ISO-8601 layouts accepted when no UTC offset is present
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a session JSON string into a RawSession
pub fn parse_session(json: &str) -> Result<RawSession, ScoreError> {
    serde_json::from_str(json)
        .map_err(|e| ScoreError::ParseError(e.to_string()))
}

/// Parse NDJSON containing one session per line
pub fn parse_sessions_ndjson(ndjson: &str) -> Result<Vec<RawSession>, ScoreError> {
    let mut sessions = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let session = serde_json::from_str::<RawSession>(trimmed).map_err(|e| {
            ScoreError::ParseError(format!("line {}: {}", line_num + 1, e))
        })?;
        sessions.push(session);
    }
    Ok(sessions)
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive timestamp (optionally suffixed
/// with `Z`) which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ScoreError> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = trimmed.trim_end_matches('Z');
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ScoreError::TimestampError(format!("unrecognized timestamp '{}'", raw)))
}

/// Convert fractional seconds since the Unix epoch into a UTC time
pub fn parse_epoch_seconds(seconds: f64) -> Result<DateTime<Utc>, ScoreError> {
    if !seconds.is_finite() {
        return Err(ScoreError::TimestampError(format!(
            "non-finite epoch timestamp {seconds}"
        )));
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
        .ok_or_else(|| ScoreError::TimestampError(format!("epoch timestamp {seconds} out of range")))
}

/// Convert one raw event into a timed point
pub fn to_timed_point(event: &RawEvent) -> Result<TimedPoint, EventProblem> {
    let timestamp = match &event.timestamp {
        None => return Err(EventProblem::MissingField("timestamp")),
        Some(Recorded::Malformed(_)) => return Err(EventProblem::WrongType("timestamp")),
        Some(Recorded::Valid(timestamp)) => timestamp,
    };
    let x = coordinate(&event.x, "x")?;
    let y = coordinate(&event.y, "y")?;

    if !x.is_finite() || !y.is_finite() {
        return Err(EventProblem::NonFiniteCoordinate);
    }

    let at = match timestamp {
        RawTimestamp::Text(text) => {
            parse_timestamp(text).map_err(|_| EventProblem::BadTimestamp(text.clone()))?
        }
        RawTimestamp::Epoch(seconds) => parse_epoch_seconds(*seconds)
            .map_err(|_| EventProblem::BadTimestamp(seconds.to_string()))?,
    };

    Ok(TimedPoint { x, y, at })
}

fn coordinate(value: &Option<Recorded<f64>>, field: &'static str) -> Result<f64, EventProblem> {
    match value {
        None => Err(EventProblem::MissingField(field)),
        Some(Recorded::Malformed(_)) => Err(EventProblem::WrongType(field)),
        Some(Recorded::Valid(v)) => Ok(*v),
    }
}

/// Convert a whole event collection into points sorted by timestamp.
///
/// Fails on the first malformed event; callers decide how to degrade.
pub fn to_sorted_trace(events: &[RawEvent]) -> Result<Vec<TimedPoint>, EventIssue> {
    let mut points = events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            to_timed_point(event).map_err(|problem| EventIssue { index, problem })
        })
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|p| p.at);
    Ok(points)
}

/// Why an event could not be used
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventProblem {
    MissingField(&'static str),
    WrongType(&'static str),
    BadTimestamp(String),
    NonFiniteCoordinate,
}

impl fmt::Display for EventProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventProblem::MissingField(field) => write!(f, "missing field '{field}'"),
            EventProblem::WrongType(field) => write!(f, "field '{field}' has the wrong type"),
            EventProblem::BadTimestamp(ts) => write!(f, "unparseable timestamp '{ts}'"),
            EventProblem::NonFiniteCoordinate => write!(f, "non-finite coordinate"),
        }
    }
}

/// A malformed event at a position within its collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventIssue {
    pub index: usize,
    pub problem: EventProblem,
}

impl fmt::Display for EventIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {}: {}", self.index, self.problem)
    }
}

/// Per-collection validation findings for one session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionValidation {
    pub total_events: usize,
    pub mouse_movements: Vec<EventIssue>,
    pub mouse_clicks: Vec<EventIssue>,
    pub mouse_down: Vec<EventIssue>,
}

impl SessionValidation {
    pub fn invalid_events(&self) -> usize {
        self.mouse_movements.len() + self.mouse_clicks.len() + self.mouse_down.len()
    }

    pub fn is_clean(&self) -> bool {
        self.invalid_events() == 0
    }
}

/// List every malformed event in a session
pub fn validate_session(session: &RawSession) -> SessionValidation {
    fn issues(events: &[RawEvent]) -> Vec<EventIssue> {
        events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                to_timed_point(event)
                    .err()
                    .map(|problem| EventIssue { index, problem })
            })
            .collect()
    }

    SessionValidation {
        total_events: session.mouse_movements.len()
            + session.mouse_clicks.len()
            + session.mouse_down.len(),
        mouse_movements: issues(&session.mouse_movements),
        mouse_clicks: issues(&session.mouse_clicks),
        mouse_down: issues(&session.mouse_down),
    }
}
