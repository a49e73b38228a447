mod support;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tokio::time::sleep;

use support::TestApp;

const BLACKOUT: &str = "haunted-blackout-sensor";

#[tokio::test(start_paused = true)]
async fn triggered_sensor_returns_to_not_detected_after_two_seconds() {
    let app = TestApp::offline();
    let (status, _) = app
        .post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.sensor_state(BLACKOUT).await, "DETECTED");

    sleep(Duration::from_millis(1_900)).await;
    assert_eq!(app.sensor_state(BLACKOUT).await, "DETECTED");

    sleep(Duration::from_millis(200)).await;
    assert_eq!(app.sensor_state(BLACKOUT).await, "NOT_DETECTED");
}

#[tokio::test(start_paused = true)]
async fn retrigger_extends_the_reset_window() {
    let app = TestApp::offline();
    app.post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;

    sleep(Duration::from_millis(1_500)).await;
    app.post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;

    // 2.1 s after the first trigger, only 0.6 s after the second.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(app.sensor_state(BLACKOUT).await, "DETECTED");

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(app.sensor_state(BLACKOUT).await, "NOT_DETECTED");
}

#[tokio::test(start_paused = true)]
async fn sensors_reset_independently() {
    let app = TestApp::offline();
    app.post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;
    sleep(Duration::from_millis(1_000)).await;
    app.post_json("/api/trigger-direct", json!({ "effect": "plug_on" }))
        .await;

    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(app.sensor_state(BLACKOUT).await, "NOT_DETECTED");
    assert_eq!(app.sensor_state("haunted-plug-on-sensor").await, "DETECTED");
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_resets() {
    let app = TestApp::offline();
    app.post_json("/api/trigger-direct", json!({ "effect": "reset" }))
        .await;
    assert!(app.state.sensors().has_pending_reset("haunted-reset-sensor"));

    app.state.shutdown();
    assert!(!app.state.sensors().has_pending_reset("haunted-reset-sensor"));

    sleep(Duration::from_millis(3_000)).await;
    assert_eq!(app.sensor_state("haunted-reset-sensor").await, "DETECTED");
}
