//! Integration tests for metadata resolution through the run context using wiremock

use core::time::Duration;
use ppastats::facts::file_cache::key_for_url;
use ppastats::facts::{Context, FetchError, RetryPolicy, Settings};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_context(cache_root: &Path) -> Context {
    Context::open(Settings {
        retry: RetryPolicy::new(0, Duration::from_millis(1)),
        ..Settings::new(cache_root)
    })
    .expect("Failed to open context")
}

#[tokio::test]
async fn test_malformed_metadata_is_not_retried_or_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ubuntu/jammy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut ctx = open_context(temp_dir.path());
    let url = format!("{}/ubuntu/jammy", mock_server.uri());

    let err = ctx.distro_series(&url).await.unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
    assert_eq!(ctx.fetcher().request_count(), 1);
    assert!(ctx.files().get(&key_for_url(&url).unwrap()).is_none());
    ctx.close();
}

#[tokio::test]
async fn test_unreadable_cached_metadata_is_refetched_and_replaced() {
    let mock_server = MockServer::start().await;
    let body = r#"{"name":"jammy","version":"22.04"}"#;

    Mock::given(method("GET"))
        .and(path("/ubuntu/jammy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut ctx = open_context(temp_dir.path());
    let url = format!("{}/ubuntu/jammy", mock_server.uri());
    let key = key_for_url(&url).unwrap();
    ctx.files().put(&key, "{\"name\":");

    let distro = ctx.distro_series(&url).await.unwrap();

    assert_eq!(distro.version, "22.04");
    assert_eq!(ctx.fetcher().request_count(), 1);
    assert_eq!(ctx.files().get(&key).as_deref(), Some(body));
    ctx.close();
}

#[tokio::test]
async fn test_fetched_metadata_is_cached_once_decoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ubuntu/jammy/amd64"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"architecture_tag":"amd64","is_nominated_arch_indep":true,"distroseries_link":"https://lp.test/ubuntu/jammy"}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("{}/ubuntu/jammy/amd64", mock_server.uri());

    let mut ctx = open_context(temp_dir.path());
    let arch = ctx.arch_series(&url).await.unwrap();
    assert!(arch.is_nominated_arch_indep);
    ctx.close();

    // a new run finds it on disk
    let mut ctx = open_context(temp_dir.path());
    let arch = ctx.arch_series(&url).await.unwrap();
    assert_eq!(arch.architecture_tag, "amd64");
    assert_eq!(ctx.fetcher().request_count(), 0);
    ctx.close();
}
