//! End-to-end scoring of synthetic sessions

use botscore::encoder::Stage;
use botscore::session::Recorded;
use botscore::{
    score_session, AnalysisOutcome, PipelineConfig, PipelineOutcome, RawEvent, RawSession,
    ScoreReport, SessionScorer,
};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::f64::consts::PI;

const START: (f64, f64) = (960.0, 500.0);
const FIRST_CLICK: (f64, f64, i64) = (1866.0, 21.0, 2000);
const SECOND_CLICK: (f64, f64, i64) = (26.0, 867.0, 5000);
const SAMPLE_MS: i64 = 16;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
}

fn ts(ms: i64) -> String {
    (base() + Duration::milliseconds(ms)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Minimum-jerk progress along a reach
fn min_jerk(tau: f64) -> f64 {
    10.0 * tau.powi(3) - 15.0 * tau.powi(4) + 6.0 * tau.powi(5)
}

/// Movement trace from the start point through both click targets.
///
/// Human traces bow away from the straight line, wobble, and accelerate
/// smoothly; scripted traces interpolate linearly at constant speed.
fn movements(human: bool) -> Vec<RawEvent> {
    let waypoints = [
        (START.0, START.1, 0),
        (FIRST_CLICK.0, FIRST_CLICK.1, FIRST_CLICK.2),
        (SECOND_CLICK.0, SECOND_CLICK.1, SECOND_CLICK.2),
    ];

    let mut events = Vec::new();
    let mut i = 0;
    for pair in waypoints.windows(2) {
        let (x0, y0, t0) = pair[0];
        let (x1, y1, t1) = pair[1];
        let (dx, dy) = (x1 - x0, y1 - y0);
        let length = dx.hypot(dy);
        let (nx, ny) = (-dy / length, dx / length);

        let mut t = t0;
        while t < t1 {
            let tau = (t - t0) as f64 / (t1 - t0) as f64;
            let (x, y) = if human {
                let progress = min_jerk(tau);
                let envelope = (PI * tau).sin();
                let bow = envelope * 60.0 + envelope * 1.5 * (i as f64 * 1.7).sin();
                (x0 + dx * progress + nx * bow, y0 + dy * progress + ny * bow)
            } else {
                (x0 + dx * tau, y0 + dy * tau)
            };
            events.push(RawEvent::new(x, y, ts(t)));
            t += SAMPLE_MS;
            i += 1;
        }
    }

    events.push(RawEvent::new(SECOND_CLICK.0, SECOND_CLICK.1, ts(SECOND_CLICK.2)));
    for k in 1..20 {
        let (step_x, step_y) = if human { (2.0, 1.3) } else { (1.0, 1.0) };
        events.push(RawEvent::new(
            SECOND_CLICK.0 + k as f64 * step_x,
            SECOND_CLICK.1 - k as f64 * step_y,
            ts(SECOND_CLICK.2 + k * SAMPLE_MS),
        ));
    }
    events
}

fn clicks() -> Vec<RawEvent> {
    vec![
        RawEvent::new(FIRST_CLICK.0, FIRST_CLICK.1, ts(FIRST_CLICK.2)),
        RawEvent::new(SECOND_CLICK.0, SECOND_CLICK.1, ts(SECOND_CLICK.2)),
    ]
}

fn human_session() -> RawSession {
    RawSession {
        project_id: Some("checkout".to_string()),
        user_id: Some("user-17".to_string()),
        session_id: Some("session-human".to_string()),
        mouse_movements: movements(true),
        mouse_clicks: clicks(),
        mouse_down: clicks(),
    }
}

/// Straight-line cursor whose presses land where the cursor never was
fn scripted_session() -> RawSession {
    RawSession {
        session_id: Some("session-bot".to_string()),
        mouse_movements: movements(false),
        mouse_clicks: clicks(),
        mouse_down: vec![
            RawEvent::new(500.0, 500.0, ts(FIRST_CLICK.2)),
            RawEvent::new(700.0, 100.0, ts(SECOND_CLICK.2)),
        ],
        ..Default::default()
    }
}

/// Constant-speed straight glide between the two targets, no presses
fn straight_glide_session(samples: usize, speed: f64) -> RawSession {
    const STEP_MS: i64 = 11;
    let (dx, dy) = (SECOND_CLICK.0 - FIRST_CLICK.0, SECOND_CLICK.1 - FIRST_CLICK.1);
    let length = dx.hypot(dy);
    let step = speed * STEP_MS as f64 / 1000.0;

    let mouse_movements = (0..samples)
        .map(|i| {
            let travelled = step * i as f64;
            RawEvent::new(
                FIRST_CLICK.0 + dx / length * travelled,
                FIRST_CLICK.1 + dy / length * travelled,
                ts(i as i64 * STEP_MS),
            )
        })
        .collect();

    let end_ms = samples as i64 * STEP_MS;
    RawSession {
        mouse_movements,
        mouse_clicks: vec![
            RawEvent::new(FIRST_CLICK.0, FIRST_CLICK.1, ts(0)),
            RawEvent::new(SECOND_CLICK.0, SECOND_CLICK.1, ts(end_ms)),
        ],
        ..Default::default()
    }
}

fn scored(outcome: PipelineOutcome) -> ScoreReport {
    match outcome {
        PipelineOutcome::Scored(report) => report,
        PipelineOutcome::Failed(failure) => panic!("session failed: {:?}", failure),
    }
}

#[test]
fn test_human_session_scores_higher_than_scripted() {
    let scorer = SessionScorer::default();
    let human = scored(scorer.score(&human_session()));
    let bot = scored(scorer.score(&scripted_session()));

    assert_eq!(human.analysis.outcome, AnalysisOutcome::Evaluated);
    assert_eq!(bot.analysis.outcome, AnalysisOutcome::Evaluated);
    assert!(human.analysis.score > 0.0 && human.analysis.score <= 1.0);
    assert!(
        human.analysis.score > bot.analysis.score,
        "human {} vs scripted {}",
        human.analysis.score,
        bot.analysis.score
    );

    // Default rules cap even natural sessions well short of the human extreme
    assert!(human.analysis.score < 0.5, "human {}", human.analysis.score);

    assert_eq!(human.analysis.metrics.len(), 8);
    assert_eq!(human.analysis.metrics["mouse_down_up_features"].score, 0.0);
    assert_eq!(bot.analysis.metrics["mouse_down_up_features"].score, 1.0);
    assert!(human.analysis.metrics["checkbox_path_score"].score < 1.0);
    assert!(bot.analysis.metrics["checkbox_path_score"].score > 0.99);
}

#[test]
fn test_straight_glide_at_normal_speed_scores_as_bot() {
    let scorer = SessionScorer::default();
    let glide = scored(scorer.score(&straight_glide_session(300, 600.0)));
    let human = scored(scorer.score(&human_session()));

    assert_eq!(glide.analysis.outcome, AnalysisOutcome::Evaluated);
    let velocity = glide.analysis.metrics["mouse_movement_avg_velocity"].score;
    assert!(velocity > 0.4 && velocity < 0.6, "velocity score {velocity}");

    // Straight inter-click paths are machine-like whatever the speed
    assert_eq!(glide.analysis.metrics["checkbox_path_score"].score, 1.0);
    assert!(glide.analysis.score < 0.25, "glide {}", glide.analysis.score);
    assert!(human.analysis.score > glide.analysis.score);
}

#[test]
fn test_swapped_click_order_is_non_compliant() {
    let mut session = human_session();
    session.mouse_clicks = vec![
        RawEvent::new(SECOND_CLICK.0, SECOND_CLICK.1, ts(FIRST_CLICK.2)),
        RawEvent::new(FIRST_CLICK.0, FIRST_CLICK.1, ts(SECOND_CLICK.2)),
    ];

    let report = scored(SessionScorer::default().score(&session));
    assert_eq!(report.analysis.outcome, AnalysisOutcome::NonCompliant);
    assert_eq!(report.analysis.score, 0.0);
    assert_eq!(report.analysis.suspicion, 1.0);
    assert_eq!(report.analysis.metrics.len(), 1);
    assert_eq!(report.analysis.metrics["bot_behavior"].weight, 1.0);
}

#[test]
fn test_too_few_movements_short_circuits() {
    let mut session = human_session();
    session.mouse_movements.truncate(40);

    let report = scored(SessionScorer::default().score(&session));
    assert_eq!(report.analysis.outcome, AnalysisOutcome::InsufficientMovement);
    assert_eq!(report.analysis.score, 0.0);
}

#[test]
fn test_score_session_json_end_to_end() {
    let json = serde_json::to_string(&human_session()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&score_session(&json).unwrap()).unwrap();

    assert_eq!(report["success"], true);
    assert_eq!(report["project_id"], "checkout");
    assert_eq!(report["user_id"], "user-17");
    assert_eq!(report["session_id"], "session-human");
    assert_eq!(report["producer"]["name"], "botscore");
    assert!(report["producer"]["instance_id"].as_str().unwrap().len() >= 32);
    assert!(report["analysis"]["score"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_scoring_is_deterministic() {
    let scorer = SessionScorer::default();
    let first = scored(scorer.score(&human_session()));
    let second = scored(scorer.score(&human_session()));
    assert_eq!(first.analysis, second.analysis);
}

#[test]
fn test_malformed_press_degrades_locally() {
    let scorer = SessionScorer::default();
    let clean = scored(scorer.score(&human_session()));

    let mut session = human_session();
    session.mouse_down.push(RawEvent {
        x: Some(Recorded::Valid(10.0)),
        y: Some(Recorded::Valid(10.0)),
        timestamp: Some("not a timestamp".into()),
    });
    let degraded = scored(scorer.score(&session));

    assert_eq!(degraded.analysis.outcome, AnalysisOutcome::Evaluated);
    assert_eq!(degraded.analysis.metrics["mouse_down_up_features"].score, 1.0);
    assert_eq!(
        degraded.analysis.metrics["checkbox_path_score"],
        clean.analysis.metrics["checkbox_path_score"]
    );
    assert!(degraded.analysis.score < clean.analysis.score);
}

#[test]
fn test_wrongly_typed_event_degrades_locally() {
    let scorer = SessionScorer::default();
    let mut value = serde_json::to_value(human_session()).unwrap();
    value["mouse_movements"][3]["x"] = serde_json::json!("12");

    let report = scored(scorer.score_json(&value.to_string()));
    assert_eq!(report.analysis.outcome, AnalysisOutcome::Evaluated);
    assert_eq!(report.analysis.metrics["mouse_movement_avg_velocity"].score, 1.0);
    assert!(!report.analysis.metrics.contains_key("bot_behavior"));
}

#[test]
fn test_epoch_timestamps_are_accepted() {
    let scorer = SessionScorer::default();
    let mut value = serde_json::to_value(human_session()).unwrap();
    for collection in ["mouse_movements", "mouse_clicks", "mouse_down"] {
        for event in value[collection].as_array_mut().unwrap() {
            let at = DateTime::parse_from_rfc3339(event["timestamp"].as_str().unwrap()).unwrap();
            event["timestamp"] = serde_json::json!(at.timestamp_millis() as f64 / 1000.0);
        }
    }

    let session = botscore::parse_session(&value.to_string()).unwrap();
    let features = scorer.extract_features(&session).unwrap();
    assert!(features.degradations().is_empty());
    assert_eq!(
        scored(scorer.score(&session)).analysis.outcome,
        AnalysisOutcome::Evaluated
    );
}

#[test]
fn test_unusable_session_fails_in_preprocessing() {
    let bad = RawEvent {
        x: None,
        y: None,
        timestamp: Some("??".into()),
    };
    let session = RawSession {
        mouse_movements: vec![bad.clone()],
        mouse_clicks: vec![bad.clone()],
        mouse_down: vec![bad],
        ..Default::default()
    };

    match SessionScorer::default().score(&session) {
        PipelineOutcome::Failed(failure) => {
            assert!(!failure.success);
            assert_eq!(failure.stage, Stage::Preprocessing);
        }
        PipelineOutcome::Scored(_) => panic!("expected a preprocessing failure"),
    }
}

#[test]
fn test_custom_action_script() {
    let config = PipelineConfig::from_json(
        r#"{"actions": [
            {"id": "a", "type": "click", "args": {"location": {"x": 400, "y": 400}}},
            {"id": "b", "type": "click", "args": {"location": {"x": 800, "y": 400}}}
        ]}"#,
    )
    .unwrap();
    let scorer = SessionScorer::new(config).unwrap();

    let report = scored(scorer.score(&human_session()));
    assert_eq!(report.analysis.outcome, AnalysisOutcome::NonCompliant);
}

#[test]
fn test_scorer_shared_across_threads() {
    let scorer = std::sync::Arc::new(SessionScorer::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scorer = scorer.clone();
            std::thread::spawn(move || scorer.score(&human_session()).score())
        })
        .collect();

    let scores: Vec<Option<f64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(scores.iter().all(|s| *s == scores[0] && s.is_some()));
}
