//! Fetch loop tests against a mock One Call server
//! - one row per day, ascending, exact formatting
//! - abort on bad status / missing field / network failure, keeping earlier rows
//! - skip policy, including the non-zero outcome of the CLI run
//! - request timeout
//! - request parameters

use chrono::{FixedOffset, NaiveDate};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::time::Duration;
use sunrise_sunset::{Cli, ErrorPolicy, FetchConfig, FetchError, Zone, run, run_fetch};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUNRISE: i64 = 1672567200;
const SUNSET: i64 = 1672603200;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn config(base_url: &str, out: &Path) -> FetchConfig {
    let mut cfg = FetchConfig::new(
        40.7895,
        74.0565,
        "test-key",
        date("2023-01-01"),
        date("2023-01-04"),
    );
    cfg.base_url = base_url.to_string();
    cfg.output = out.to_path_buf();
    cfg.zone = Zone::Fixed(FixedOffset::east_opt(0).unwrap());
    cfg
}

fn sun_body() -> serde_json::Value {
    serde_json::json!({
        "lat": 40.7895,
        "lon": 74.0565,
        "current": { "sunrise": SUNRISE, "sunset": SUNSET, "temp": -2.5 }
    })
}

async fn mount_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sun_body()))
        .mount(server)
        .await;
}

fn lines(p: &Path) -> Vec<String> {
    fs::read_to_string(p)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn writes_one_row_per_day() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sunrise_sunset.csv");
    let cfg = config(&server.uri(), &out);

    let summary = run_fetch(&cfg).await.unwrap();
    assert_eq!(summary.written, 3);
    assert!(summary.skipped.is_empty());

    assert_eq!(
        lines(&out),
        [
            "2023-01-01,2023-01-01 10:00:00,2023-01-01 20:00:00",
            "2023-01-02,2023-01-01 10:00:00,2023-01-01 20:00:00",
            "2023-01-03,2023-01-01 10:00:00,2023-01-01 20:00:00",
        ]
    );
}

#[tokio::test]
async fn rows_are_ascending_without_gaps() {
    let server = MockServer::start().await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("year.csv");
    let mut cfg = config(&server.uri(), &out);
    cfg.start_date = date("2023-02-20");
    cfg.end_date = date("2023-03-10");

    run_fetch(&cfg).await.unwrap();

    let dates: Vec<NaiveDate> = lines(&out)
        .iter()
        .map(|l| date(l.split(',').next().unwrap()))
        .collect();
    assert_eq!(dates.len(), cfg.day_count());
    assert_eq!(dates[0], cfg.start_date);
    for pair in dates.windows(2) {
        assert_eq!(pair[1], pair[0].succ_opt().unwrap());
    }
    assert_eq!(dates.last().unwrap().succ_opt().unwrap(), cfg.end_date);
}

#[tokio::test]
async fn sends_every_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("lat", "40.7895"))
        .and(query_param("lon", "74.0565"))
        .and(query_param("exclude", "current,minutely,hourly,alerts"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "test-key"))
        .and(query_param("dt", "2023-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sun_body()))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("one.csv");
    let mut cfg = config(&server.uri(), &out);
    cfg.start_date = date("2023-01-02");
    cfg.end_date = date("2023-01-03");

    let summary = run_fetch(&cfg).await.unwrap();
    assert_eq!(summary.written, 1);
}

#[tokio::test]
async fn bad_status_aborts_and_keeps_earlier_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("dt", "2023-01-02"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("partial.csv");
    let cfg = config(&server.uri(), &out);

    let err = run_fetch(&cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { date: d, .. } if d == date("2023-01-02")));

    let rows = lines(&out);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("2023-01-01,"));
}

#[tokio::test]
async fn malformed_body_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("dt", "2023-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("partial.csv");
    let cfg = config(&server.uri(), &out);

    let err = run_fetch(&cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::JsonParse { .. }));
    assert_eq!(lines(&out).len(), 1);
}

#[tokio::test]
async fn missing_sunrise_aborts_without_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "current": { "sunset": SUNSET } })),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.csv");
    let cfg = config(&server.uri(), &out);

    let err = run_fetch(&cfg).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::MissingField {
            field: "current.sunrise",
            ..
        }
    ));
    assert!(lines(&out).is_empty());
}

#[tokio::test]
async fn skip_policy_continues_past_bad_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("dt", "2023-01-02"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("lenient.csv");
    let mut cfg = config(&server.uri(), &out);
    cfg.on_error = ErrorPolicy::Skip;

    let summary = run_fetch(&cfg).await.unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, date("2023-01-02"));
    assert!(summary.skipped[0].1.contains("503"));

    let rows = lines(&out);
    assert!(rows[0].starts_with("2023-01-01,"));
    assert!(rows[1].starts_with("2023-01-03,"));
}

#[tokio::test]
async fn skipped_days_fail_the_cli_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .and(query_param("dt", "2023-01-02"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_ok(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cli.csv");
    let uri = server.uri();
    let out_arg = out.to_string_lossy().to_string();

    let cli = Cli::try_parse_from([
        "sunrise-sunset",
        "fetch",
        "--latitude",
        "40.7895",
        "--longitude",
        "74.0565",
        "--api-key",
        "test-key",
        "--start-date",
        "2023-01-01",
        "--end-date",
        "2023-01-04",
        "--output",
        out_arg.as_str(),
        "--base-url",
        uri.as_str(),
        "--utc-offset",
        "+00:00",
        "--on-error",
        "skip",
    ])
    .unwrap();

    let err = run(cli).await.unwrap_err();
    assert!(err.to_string().contains("1 of 3 days"), "{err}");

    let rows = lines(&out);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("2023-01-01,"));
    assert!(rows[1].starts_with("2023-01-03,"));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/onecall"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(sun_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("slow.csv");
    let mut cfg = config(&server.uri(), &out);
    cfg.end_date = date("2023-01-02");
    cfg.timeout = Some(Duration::from_millis(200));

    let err = run_fetch(&cfg).await.unwrap_err();
    match &err {
        FetchError::Network { date: d, source } => {
            assert_eq!(*d, date("2023-01-01"));
            assert!(source.is_timeout(), "{source}");
        }
        other => panic!("expected a network timeout, got {other}"),
    }
    assert!(lines(&out).is_empty());
}

#[tokio::test]
async fn network_failure_aborts() {
    // Nothing listens on the discard port.
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("offline.csv");
    let cfg = config("http://127.0.0.1:9", &out);

    let err = run_fetch(&cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
    assert!(lines(&out).is_empty());
}

#[tokio::test]
async fn unwritable_output_is_a_file_create_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("missing-dir").join("out.csv");
    let cfg = config("http://127.0.0.1:9", &out);

    let err = run_fetch(&cfg).await.unwrap_err();
    assert!(matches!(err, FetchError::FileCreate { .. }));
}
