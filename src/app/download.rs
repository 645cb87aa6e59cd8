//! Streaming archive downloads with non-blocking progress snapshots
//!
//! A download derives its file name from the URL, validates the response
//! `content-type` and `content-length`, and streams the body into a file
//! opened with exclusive-create semantics (an existing file is never
//! touched). While the copy runs, an independent interval task samples a
//! shared byte counter and sends [`ProgressSnapshot`] values over a channel,
//! so reporting never stalls the transfer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::app::client::PinnedClient;
use crate::constants::{archive, progress};
use crate::errors::{DownloadError, DownloadResult, FetchError};

/// A point-in-time view of a running download
///
/// Emitted repeatedly while the transfer runs and once more at completion;
/// `bytes` is non-decreasing across the snapshots of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Destination file being written
    pub path: PathBuf,
    /// Bytes written to disk so far
    pub bytes: u64,
    /// Expected total from the response `content-length`
    pub total: u64,
}

/// Channel end snapshots are sent to; `None` disables reporting entirely
pub type ProgressSender = mpsc::UnboundedSender<ProgressSnapshot>;

/// Completed download: final path and bytes written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Streaming downloader bound to a pinned HTTP client
#[derive(Clone)]
pub struct Downloader {
    client: Arc<PinnedClient>,
    snapshot_interval: Duration,
}

impl Downloader {
    pub fn new(client: Arc<PinnedClient>) -> Self {
        Self {
            client,
            snapshot_interval: progress::SNAPSHOT_INTERVAL,
        }
    }

    /// Overrides the snapshot interval (tests use short intervals)
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Downloads `url` into `dest_dir`, streaming the body to disk
    ///
    /// # Errors
    ///
    /// - [`DownloadError::EmptyFileName`] if the URL path has no final segment
    /// - [`DownloadError::NotAZip`] if `content-type` is not the archive type
    /// - [`DownloadError::MissingLength`] if `content-length` is unusable
    /// - [`DownloadError::FileExists`] if the destination already exists
    /// - [`DownloadError::Fetch`] / [`DownloadError::Io`] for transfer failures
    pub async fn download(
        &self,
        url: &Url,
        dest_dir: &Path,
        progress: Option<ProgressSender>,
    ) -> DownloadResult<DownloadedFile> {
        let name = file_name_from_url(url)?;
        let path = dest_dir.join(name);

        let response = self.client.get_response(url).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with(archive::ZIP_MEDIA_TYPE) {
            return Err(DownloadError::NotAZip {
                url: url.clone(),
                content_type: content_type.to_string(),
            });
        }

        let total = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| DownloadError::MissingLength { url: url.clone() })?;

        // Exclusive create: a collision must not touch the existing file
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    DownloadError::FileExists { path: path.clone() }
                } else {
                    DownloadError::Io(e)
                }
            })?;

        debug!("downloading {url} -> {} ({total} bytes)", path.display());

        let written = Arc::new(AtomicU64::new(0));
        let ticker = progress
            .as_ref()
            .map(|tx| self.spawn_ticker(tx.clone(), path.clone(), Arc::clone(&written), total));

        let result = copy_stream(response, &mut file, &written).await;

        if let Some(ticker) = ticker {
            ticker.abort();
            // Wait for the abort to land so no stale snapshot can be
            // enqueued after the final one
            let _ = ticker.await;
        }
        result?;

        let bytes = written.load(Ordering::Relaxed);
        if let Some(tx) = &progress {
            // Final snapshot; the receiver may already be gone
            let _ = tx.send(ProgressSnapshot {
                path: path.clone(),
                bytes,
                total,
            });
        }

        info!("downloaded {} ({bytes} bytes)", path.display());
        Ok(DownloadedFile { path, bytes })
    }

    /// Spawns the interval task sampling the byte counter
    ///
    /// Runs independently of the copy loop and is aborted when the transfer
    /// finishes or fails.
    fn spawn_ticker(
        &self,
        tx: ProgressSender,
        path: PathBuf,
        written: Arc<AtomicU64>,
        total: u64,
    ) -> JoinHandle<()> {
        let period = self.snapshot_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick of a tokio interval fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = ProgressSnapshot {
                    path: path.clone(),
                    bytes: written.load(Ordering::Relaxed),
                    total,
                };
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
        })
    }
}

/// Streams the response body into the file, bumping the shared counter
async fn copy_stream(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    written: &AtomicU64,
) -> DownloadResult<()> {
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Fetch(FetchError::Http(e)))?;
        file.write_all(&chunk).await?;
        written.fetch_add(chunk.len() as u64, Ordering::Relaxed);
    }
    file.flush().await?;
    Ok(())
}

/// Derives the destination file name from the URL's final path segment
fn file_name_from_url(url: &Url) -> DownloadResult<String> {
    let name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("")
        .trim();

    if name.is_empty() {
        return Err(DownloadError::EmptyFileName { url: url.clone() });
    }
    Ok(name.to_string())
}
