//! Integration tests for daily download history synchronization using wiremock

use chrono::{DateTime, NaiveDate, Utc};
use core::time::Duration;
use ppastats::facts::file_cache::key_for_url;
use ppastats::facts::launchpad::{TotalSeries, parse_time};
use ppastats::facts::{Context, RetryPolicy, Settings, daily_totals};
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PUBLICATION_PATH: &str = "/~owner/+archive/ppa/+binarypub/1";

fn now() -> DateTime<Utc> {
    parse_time("2024-03-01T12:00:00").unwrap()
}

fn open_context(cache_root: &Path) -> Context {
    Context::open(Settings {
        retry: RetryPolicy::new(0, Duration::from_millis(1)),
        now: now(),
        ..Settings::new(cache_root)
    })
    .expect("Failed to open context")
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn history_key(self_link: &str) -> String {
    format!("{}/ddts", key_for_url(self_link).unwrap())
}

#[tokio::test]
async fn test_first_sync_starts_at_creation_and_saves_settled_days() {
    let mock_server = MockServer::start().await;
    let self_link = format!("{}{PUBLICATION_PATH}", mock_server.uri());

    // 2024-01-26 is five weeks old, 2024-02-09 three weeks old
    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .and(query_param("ws.op", "getDailyDownloadTotals"))
        .and(query_param("start_date", "2024-01-20"))
        .and(query_param_is_missing("end_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2024-01-26T00:00:00+00:00": 5,
            "2024-02-09T00:00:00+00:00": 3,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = open_context(temp_dir.path());

    let totals = daily_totals(&ctx, &self_link, parse_time("2024-01-20T08:30:00").unwrap()).await.unwrap();

    assert_eq!(totals.total(), 8);
    assert_eq!(totals.len(), 2);

    let saved: TotalSeries = serde_json::from_str(&ctx.files().get(&history_key(&self_link)).unwrap()).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved.get(day("2024-01-26")), Some(5));
    assert_eq!(saved.get(day("2024-02-09")), None);
    ctx.close();
}

#[tokio::test]
async fn test_resumes_from_latest_cached_day_and_prefers_fresh_counts() {
    let mock_server = MockServer::start().await;
    let self_link = format!("{}{PUBLICATION_PATH}", mock_server.uri());

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .and(query_param("start_date", "2024-01-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2024-01-10T00:00:00+00:00": 6,
            "2024-01-11T00:00:00+00:00": 2,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = open_context(temp_dir.path());
    ctx.files().put(
        &history_key(&self_link),
        &json!({ "2024-01-05T00:00:00+00:00": 1, "2024-01-10T00:00:00+00:00": 5 }).to_string(),
    );

    let totals = daily_totals(&ctx, &self_link, parse_time("2024-01-01T00:00:00").unwrap()).await.unwrap();

    assert_eq!(totals.get(day("2024-01-05")), Some(1));
    assert_eq!(totals.get(day("2024-01-10")), Some(6));
    assert_eq!(totals.get(day("2024-01-11")), Some(2));
    assert_eq!(totals.total(), 9);
    ctx.close();
}

#[tokio::test]
async fn test_falls_back_to_single_days_then_resumes_open_ended() {
    let mock_server = MockServer::start().await;
    let self_link = format!("{}{PUBLICATION_PATH}", mock_server.uri());

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .and(query_param("start_date", "2024-02-27"))
        .and(query_param_is_missing("end_date"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .and(query_param("start_date", "2024-02-27"))
        .and(query_param("end_date", "2024-02-27"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "2024-02-27T00:00:00+00:00": 1 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .and(query_param("start_date", "2024-02-28"))
        .and(query_param_is_missing("end_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2024-02-28T00:00:00+00:00": 2,
            "2024-02-29T00:00:00+00:00": 3,
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = open_context(temp_dir.path());

    let totals = daily_totals(&ctx, &self_link, parse_time("2024-02-27T05:00:00").unwrap()).await.unwrap();

    assert_eq!(totals.len(), 3);
    assert_eq!(totals.total(), 6);
    ctx.close();
}

#[tokio::test]
async fn test_unreachable_history_falls_back_to_cache() {
    let mock_server = MockServer::start().await;
    let self_link = format!("{}{PUBLICATION_PATH}", mock_server.uri());

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = open_context(temp_dir.path());
    let cached = json!({ "2024-01-05T00:00:00+00:00": 4 }).to_string();
    ctx.files().put(&history_key(&self_link), &cached);

    let totals = daily_totals(&ctx, &self_link, parse_time("2024-01-01T00:00:00").unwrap()).await.unwrap();

    assert_eq!(totals.total(), 4);
    assert_eq!(ctx.files().get(&history_key(&self_link)).as_deref(), Some(cached.as_str()));
    ctx.close();
}

#[tokio::test]
async fn test_unreachable_history_without_cache_fails() {
    let mock_server = MockServer::start().await;
    let self_link = format!("{}{PUBLICATION_PATH}", mock_server.uri());

    Mock::given(method("GET"))
        .and(path(PUBLICATION_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ctx = open_context(temp_dir.path());

    let err = daily_totals(&ctx, &self_link, parse_time("2024-02-28T00:00:00").unwrap()).await.unwrap_err();

    assert!(err.is_transient());
    assert!(ctx.files().get(&history_key(&self_link)).is_none());
    ctx.close();
}
