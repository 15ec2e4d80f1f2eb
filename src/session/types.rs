//! Session and action script types
//!
//! Raw recorded sessions keep their events exactly as supplied by the caller.
//! Fields that may be missing or malformed are optional so a single bad event
//! only degrades the extractor that reads it instead of rejecting the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A field as recorded by the client.
///
/// Values of an unexpected JSON type are kept as `Malformed` so the event can
/// be reported and skipped instead of rejecting the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recorded<T> {
    Valid(T),
    Malformed(serde_json::Value),
}

impl<T> From<T> for Recorded<T> {
    fn from(value: T) -> Self {
        Recorded::Valid(value)
    }
}

/// An event timestamp: ISO-8601 text or seconds since the Unix epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

impl From<&str> for Recorded<RawTimestamp> {
    fn from(value: &str) -> Self {
        Recorded::Valid(RawTimestamp::Text(value.to_string()))
    }
}

impl From<String> for Recorded<RawTimestamp> {
    fn from(value: String) -> Self {
        Recorded::Valid(RawTimestamp::Text(value))
    }
}

/// A recorded pointer event (movement sample, click, or press)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Horizontal position in pixels
    #[serde(default)]
    pub x: Option<Recorded<f64>>,
    /// Vertical position in pixels
    #[serde(default)]
    pub y: Option<Recorded<f64>>,
    /// ISO-8601 timestamp with sub-second precision, or epoch seconds
    #[serde(default)]
    pub timestamp: Option<Recorded<RawTimestamp>>,
}

impl RawEvent {
    pub fn new(x: f64, y: f64, timestamp: impl Into<String>) -> Self {
        Self {
            x: Some(Recorded::Valid(x)),
            y: Some(Recorded::Valid(y)),
            timestamp: Some(Recorded::Valid(RawTimestamp::Text(timestamp.into()))),
        }
    }
}

/// A recorded interaction session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSession {
    /// Project identifier, echoed in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// User identifier, echoed in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session identifier, echoed in the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Movement samples
    #[serde(default)]
    pub mouse_movements: Vec<RawEvent>,
    /// Click events
    #[serde(default)]
    pub mouse_clicks: Vec<RawEvent>,
    /// Press (button-down) events
    #[serde(default, alias = "mouse_mouseDowns")]
    pub mouse_down: Vec<RawEvent>,
}

/// An event whose coordinates and timestamp parsed successfully
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPoint {
    pub x: f64,
    pub y: f64,
    pub at: DateTime<Utc>,
}

impl TimedPoint {
    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &TimedPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Seconds elapsed from `earlier` to this point
    pub fn seconds_since(&self, earlier: &TimedPoint) -> f64 {
        (self.at - earlier.at).num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
    }

    /// Whether both axes lie within `tolerance` pixels of `(x, y)`
    pub fn within(&self, x: f64, y: f64, tolerance: f64) -> bool {
        (self.x - x).abs() <= tolerance && (self.y - y).abs() <= tolerance
    }
}

/// Kind of scripted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Click,
    Input,
    /// Any other action kind; ignored by the click matcher
    #[serde(untagged)]
    Other(String),
}

/// Screen location of a scripted action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// Arguments of a scripted action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionArgs {
    /// Target location (required for clicks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Any other arguments (input values, bounding boxes, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One expected UI action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub args: ActionArgs,
}

impl Action {
    /// Scripted click at a fixed location
    pub fn click(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            action_type: ActionType::Click,
            args: ActionArgs {
                location: Some(Location { x, y }),
                extra: serde_json::Map::new(),
            },
        }
    }
}

/// A scripted click target, in script order
#[derive(Debug, Clone, PartialEq)]
pub struct ClickTarget {
    pub action_id: String,
    pub x: f64,
    pub y: f64,
}

/// Ordered sequence of expected actions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionScript(pub Vec<Action>);

impl ActionScript {
    pub fn new(actions: Vec<Action>) -> Self {
        Self(actions)
    }

    pub fn actions(&self) -> &[Action] {
        &self.0
    }

    /// Click targets in script order. Clicks without a location are skipped.
    pub fn click_targets(&self) -> Vec<ClickTarget> {
        self.0
            .iter()
            .filter(|a| a.action_type == ActionType::Click)
            .filter_map(|a| {
                a.args.location.map(|loc| ClickTarget {
                    action_id: a.id.clone(),
                    x: loc.x,
                    y: loc.y,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_serialization() {
        let json = serde_json::to_string(&ActionType::Click).unwrap();
        assert_eq!(json, "\"click\"");

        let parsed: ActionType = serde_json::from_str("\"scroll\"").unwrap();
        assert_eq!(parsed, ActionType::Other("scroll".to_string()));
    }

    #[test]
    fn test_action_script_deserialization() {
        let json = r#"[
            {"id": "1", "type": "click", "args": {"location": {"x": 25, "y": 19}}},
            {
                "id": "2",
                "type": "input",
                "args": {
                    "value": "test@example.com",
                    "box": {"top": 190, "right": 400, "bottom": 210, "left": 80}
                },
                "css": {"selector": "input[type='text']"}
            },
            {"id": "3", "type": "click", "args": {"location": {"x": 1867, "y": 19}}}
        ]"#;

        let script: ActionScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.actions().len(), 3);
        assert_eq!(script.actions()[1].action_type, ActionType::Input);
        assert!(script.actions()[1].args.extra.contains_key("value"));

        let targets = script.click_targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].action_id, "1");
        assert_eq!(targets[1].x, 1867.0);
    }

    #[test]
    fn test_session_press_alias() {
        let json = r#"{
            "user_id": "u-1",
            "mouse_movements": [{"x": 1, "y": 2, "timestamp": "2024-01-15T14:00:00.100Z"}],
            "mouse_mouseDowns": [{"x": 1, "y": 2, "timestamp": "2024-01-15T14:00:00.200Z"}]
        }"#;

        let session: RawSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.user_id.as_deref(), Some("u-1"));
        assert_eq!(session.mouse_down.len(), 1);
        assert!(session.mouse_clicks.is_empty());
    }

    #[test]
    fn test_event_missing_fields_parse() {
        let event: RawEvent = serde_json::from_str(r#"{"x": 4}"#).unwrap();
        assert_eq!(event.x, Some(Recorded::Valid(4.0)));
        assert!(event.y.is_none());
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn test_event_wrong_types_are_kept() {
        let event: RawEvent =
            serde_json::from_str(r#"{"x": "12", "y": 7, "timestamp": 1705327200.5}"#).unwrap();
        assert_eq!(
            event.x,
            Some(Recorded::Malformed(serde_json::Value::String("12".to_string())))
        );
        assert_eq!(event.y, Some(Recorded::Valid(7.0)));
        assert_eq!(
            event.timestamp,
            Some(Recorded::Valid(RawTimestamp::Epoch(1705327200.5)))
        );

        let event: RawEvent = serde_json::from_str(r#"{"timestamp": true}"#).unwrap();
        assert!(matches!(event.timestamp, Some(Recorded::Malformed(_))));
    }
}
