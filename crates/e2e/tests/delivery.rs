//! Spreadsheet and mail delivery through script-hosted endpoints

use std::time::Duration;

use serde_json::json;
use tokio::io::BufReader;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use consoleqa_common::config::{PathsConfig, SinkConfig};
use consoleqa_e2e::recorder::{RecorderOutcome, RunRecorder, SheetSink};
use consoleqa_e2e::{DashboardAggregator, Notifier, NotifyOutcome};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn redirecting_sink(server: &MockServer, answer: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/exec"))
        .and(header("content-type", "text/plain"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/echo?user_content_key=abc"),
        )
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(answer))
        .expect(1)
        .mount(server)
        .await;
}

async fn recorder_with_events(url: String) -> RunRecorder {
    let events = concat!(
        r#"{"title":"authenticate","suite":"setup","status":"passed"}"#, "\n",
        r#"{"title":"TC_SET_01 - Profile","suite":"Settings","status":"failed","errors":[{"message":"net::ERR_ABORTED"}]}"#, "\n",
        "\n",
        "not json\n",
        r#"{"title":"TC_SET_01 - Profile","suite":"Settings","status":"passed","retry":1}"#, "\n",
        r#"{"title":"TC_SET_02 - Password","suite":"Settings","status":"skipped"}"#, "\n",
    );
    let mut recorder = RunRecorder::new(Some(SheetSink::new(url, TIMEOUT).unwrap()));
    let seen = recorder
        .consume_lines(BufReader::new(events.as_bytes()))
        .await
        .unwrap();
    assert_eq!(seen, 4);
    recorder
}

#[tokio::test]
async fn test_sheet_push_follows_redirect() {
    let server = MockServer::start().await;
    redirecting_sink(&server, json!({ "status": "success" })).await;

    let recorder = recorder_with_events(format!("{}/exec", server.uri())).await;
    assert_eq!(recorder.rows().len(), 2);
    assert_eq!(recorder.finish().await, RecorderOutcome::Pushed(2));
}

#[tokio::test]
async fn test_sheet_rejection_falls_back_to_table() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "error", "message": "Sheet not found" })),
        )
        .mount(&server)
        .await;

    let recorder = recorder_with_events(format!("{}/exec", server.uri())).await;
    assert_eq!(recorder.finish().await, RecorderOutcome::Printed(2));
}

#[tokio::test]
async fn test_sheet_payload_uses_sheet_vocabulary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(r#""testcaseId":"TC_SET_02""#))
        .and(body_string_contains(r#""status":"SKIP""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = recorder_with_events(format!("{}/exec", server.uri())).await;
    assert_eq!(recorder.finish().await, RecorderOutcome::Pushed(2));
}

fn aggregated_paths(dir: &std::path::Path) -> PathsConfig {
    let paths = PathsConfig::rooted(dir);
    let report = json!({
        "suites": [{ "title": "billing.spec.ts", "specs": [{
            "title": "TC_BILL_01 - Plans", "file": "billing.spec.ts",
            "tests": [{ "results": [{ "status": "failed", "duration": 10, "retry": 0,
                                      "errors": [{ "message": "toHaveURL failed" }] }] }]
        }]}]
    });
    let report_path = paths.report_path();
    std::fs::create_dir_all(report_path.parent().unwrap()).unwrap();
    std::fs::write(report_path, report.to_string()).unwrap();
    DashboardAggregator::new(paths.clone()).run().unwrap();
    paths
}

fn mail_sinks(url: String) -> SinkConfig {
    SinkConfig {
        mail_url: Some(url),
        recipients: vec!["qa@example.com".to_string(), "lead@example.com".to_string()],
        timeout_secs: 5,
        ..SinkConfig::default()
    }
}

#[tokio::test]
async fn test_mail_redirect_needs_only_success_status() {
    let server = MockServer::start().await;
    redirecting_sink(&server, json!({ "anything": true })).await;

    let dir = tempfile::tempdir().unwrap();
    let paths = aggregated_paths(dir.path());
    let notifier = Notifier::new(mail_sinks(format!("{}/exec", server.uri())), paths.latest_path());
    assert_eq!(notifier.notify().await, NotifyOutcome::Sent);
}

#[tokio::test]
async fn test_mail_direct_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("qa@example.com,lead@example.com"))
        .and(body_string_contains("0% Pass Rate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = aggregated_paths(dir.path());
    let notifier = Notifier::new(mail_sinks(format!("{}/exec", server.uri())), paths.latest_path());
    assert_eq!(notifier.notify().await, NotifyOutcome::Sent);
}

#[tokio::test]
async fn test_mail_rejection_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "quota" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let paths = aggregated_paths(dir.path());
    let notifier = Notifier::new(mail_sinks(format!("{}/exec", server.uri())), paths.latest_path());
    match notifier.notify().await {
        NotifyOutcome::Failed(reason) => assert!(reason.contains("quota")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mail_without_snapshot_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = Notifier::new(
        mail_sinks("http://127.0.0.1:9/exec".to_string()),
        dir.path().join("docs/data/latest.json"),
    );
    assert!(matches!(notifier.notify().await, NotifyOutcome::Failed(_)));
}
