//! Streaming downloader behavior against a mock server
//!
//! The mock server lives on a loopback address, which reqwest connects to
//! without consulting the DNS-over-HTTPS resolver.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockResponse, MockServer};
use tokio::sync::mpsc;
use url::Url;
use ziprepack::app::{Downloader, PinnedClient};
use ziprepack::errors::{DownloadError, FetchError};

fn downloader() -> Downloader {
    let client = Arc::new(PinnedClient::new().unwrap());
    Downloader::new(client)
}

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn downloads_to_named_file_and_reports_progress() {
    let payload = body(2000);
    let server = MockServer::start(vec![(
        "/files/area.zip",
        MockResponse::zip(payload.clone()).chunked(250, Duration::from_millis(15)),
    )])
    .await;
    let dest = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = downloader()
        .with_snapshot_interval(Duration::from_millis(20))
        .download(&server.url("/files/area.zip"), dest.path(), Some(tx))
        .await
        .unwrap();

    assert_eq!(result.path, dest.path().join("area.zip"));
    assert_eq!(result.bytes, 2000);
    assert_eq!(std::fs::read(&result.path).unwrap(), payload);

    let mut snapshots = Vec::new();
    while let Some(snapshot) = rx.recv().await {
        snapshots.push(snapshot);
    }
    assert!(snapshots.len() >= 2, "expected interim and final snapshots");
    assert!(snapshots.windows(2).all(|w| w[0].bytes <= w[1].bytes));
    let last = snapshots.last().unwrap();
    assert_eq!(last.bytes, 2000);
    assert_eq!(last.total, 2000);
    assert_eq!(last.bytes, std::fs::metadata(&result.path).unwrap().len());
}

#[tokio::test]
async fn no_snapshot_arrives_after_the_final_one() {
    let server = MockServer::start(vec![(
        "/files/area.zip",
        MockResponse::zip(body(600)).chunked(100, Duration::from_millis(2)),
    )])
    .await;
    let downloader = downloader().with_snapshot_interval(Duration::from_millis(1));

    // A ticker iteration racing the completion path must not enqueue a
    // stale snapshot behind the final one
    for iteration in 0..20 {
        let dest = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        downloader
            .download(&server.url("/files/area.zip"), dest.path(), Some(tx))
            .await
            .unwrap();

        let mut snapshots = Vec::new();
        while let Some(snapshot) = rx.recv().await {
            snapshots.push(snapshot);
        }
        let last = snapshots.last().unwrap();
        assert_eq!(last.bytes, 600, "iteration {iteration}");
        assert_eq!(last.total, 600, "iteration {iteration}");
        assert!(snapshots.iter().all(|s| s.bytes <= last.bytes));
    }
}

#[tokio::test]
async fn without_progress_channel_the_download_still_completes() {
    let server =
        MockServer::start(vec![("/files/area.zip", MockResponse::zip(body(512)))]).await;
    let dest = tempfile::tempdir().unwrap();

    let result = downloader()
        .download(&server.url("/files/area.zip"), dest.path(), None)
        .await
        .unwrap();

    assert_eq!(result.bytes, 512);
    assert!(result.path.is_file());
}

#[tokio::test]
async fn existing_destination_is_never_overwritten() {
    let server =
        MockServer::start(vec![("/files/area.zip", MockResponse::zip(body(256)))]).await;
    let dest = tempfile::tempdir().unwrap();
    let existing = dest.path().join("area.zip");
    std::fs::write(&existing, b"original contents").unwrap();

    let err = downloader()
        .download(&server.url("/files/area.zip"), dest.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::FileExists { .. }));
    assert_eq!(std::fs::read(&existing).unwrap(), b"original contents");
}

#[tokio::test]
async fn wrong_content_type_creates_no_file() {
    let server = MockServer::start(vec![(
        "/files/area.zip",
        MockResponse::html("<html>an error page</html>"),
    )])
    .await;
    let dest = tempfile::tempdir().unwrap();

    let err = downloader()
        .download(&server.url("/files/area.zip"), dest.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::NotAZip { .. }));
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_content_length_is_an_error() {
    let server = MockServer::start(vec![(
        "/files/area.zip",
        MockResponse::zip(body(128)).without_length(),
    )])
    .await;
    let dest = tempfile::tempdir().unwrap();

    let err = downloader()
        .download(&server.url("/files/area.zip"), dest.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::MissingLength { .. }));
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn url_without_file_name_fails_before_any_request() {
    let server = MockServer::start(vec![]).await;
    let dest = tempfile::tempdir().unwrap();

    let err = downloader()
        .download(&server.url("/"), dest.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::EmptyFileName { .. }));
    assert_eq!(server.hit_count(), 0);
}

#[tokio::test]
async fn transport_failures_name_the_underlying_cause() {
    // Bind a port and release it so the connection is refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let url = Url::parse(&format!("http://127.0.0.1:{port}/files/area.zip")).unwrap();
    let dest = tempfile::tempdir().unwrap();

    let err = downloader().download(&url, dest.path(), None).await.unwrap_err();

    assert!(matches!(err, DownloadError::Fetch(FetchError::Http(_))));
    let message = err.to_string();
    let prefix = "HTTP request failed: ";
    assert!(message.starts_with(prefix), "got: {message}");
    assert!(message.len() > prefix.len(), "got: {message}");
}

#[tokio::test]
async fn non_200_response_carries_the_status_and_url() {
    let server = MockServer::start(vec![]).await;
    let dest = tempfile::tempdir().unwrap();
    let url = server.url("/files/gone.zip");

    let err = downloader().download(&url, dest.path(), None).await.unwrap_err();

    match err {
        DownloadError::Fetch(FetchError::Status { status, url: failed }) => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
