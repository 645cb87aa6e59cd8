//! Run orchestration: pre-flight checks, discovery, and fan-out
//!
//! The pipeline verifies the external tools exist, creates the target
//! directory, fetches the index page through the pinned client, and runs
//! one download + repackage task per discovered URL. Tasks run concurrently
//! with no ordering guarantee; an optional semaphore bounds how many run at
//! once (unbounded by default, matching the discovered-URL fan-out). Every
//! task runs to completion -- the first failure observed becomes the run's
//! error, later failures are logged, and nothing already on disk is rolled
//! back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info};
use url::Url;

use crate::app::client::PinnedClient;
use crate::app::download::{Downloader, ProgressSender};
use crate::app::index;
use crate::app::repack::{Repackager, Toolchain};
use crate::constants::{archive, index as index_constants};
use crate::errors::{AppError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Index page listing the downloadable archives
    pub index_url: Url,
    /// Upper bound on concurrently processed archives; `None` runs every
    /// discovered URL at once
    pub max_concurrent: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            index_url: Url::parse(index_constants::INDEX_URL)
                .expect("default index URL is valid"),
            max_concurrent: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_index_url(mut self, url: Url) -> Self {
        self.index_url = url;
        self
    }

    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent = limit;
        self
    }
}

/// Orchestrates one full discover/download/repackage run
pub struct Pipeline {
    config: PipelineConfig,
    client: Arc<PinnedClient>,
    downloader: Downloader,
    repackager: Repackager,
    toolchain: Arc<dyn Toolchain>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        client: Arc<PinnedClient>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        let downloader = Downloader::new(Arc::clone(&client));
        let repackager = Repackager::new(Arc::clone(&toolchain));
        Self {
            config,
            client,
            downloader,
            repackager,
            toolchain,
        }
    }

    /// Replaces the downloader (tests shorten the snapshot interval)
    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    /// Runs the pipeline, creating and populating `target_dir`
    ///
    /// Pre-flight failures (missing tool, existing directory) abort before
    /// any network or filesystem side effect.
    pub async fn run(&self, target_dir: &Path, progress: Option<ProgressSender>) -> Result<()> {
        self.check_dependencies()?;
        create_target_dir(target_dir)?;

        let body = self.client.get_text(&self.config.index_url).await?;
        let urls = index::extract_archive_urls(&body, &self.config.index_url);
        info!("found {} archive links on {}", urls.len(), self.config.index_url);

        self.process_all(urls, target_dir, progress).await
    }

    /// Confirms every required external tool resolves on PATH
    fn check_dependencies(&self) -> Result<()> {
        for tool in self.toolchain.required_tools() {
            which::which(tool).map_err(|_| AppError::DependencyMissing {
                tool: (*tool).to_string(),
            })?;
        }
        Ok(())
    }

    /// Fans out one task per URL and drains them all
    async fn process_all(
        &self,
        urls: Vec<Url>,
        target_dir: &Path,
        progress: Option<ProgressSender>,
    ) -> Result<()> {
        let semaphore = self
            .config
            .max_concurrent
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        let mut tasks = FuturesUnordered::new();
        for (item, url) in urls.into_iter().enumerate() {
            tasks.push(tokio::spawn(process_one(
                self.downloader.clone(),
                self.repackager.clone(),
                url,
                target_dir.to_path_buf(),
                item,
                progress.clone(),
                semaphore.clone(),
            )));
        }

        // Drain every task; tasks are never cancelled mid-flight, so the
        // first observed failure is reported only after all have finished
        let mut first_error = None;
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        error!("additional item failure: {e}");
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(AppError::Join(e));
                    } else {
                        error!("additional task failure: {e}");
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Downloads one archive and repackages it into its own working subfolder
async fn process_one(
    downloader: Downloader,
    repackager: Repackager,
    url: Url,
    target_dir: PathBuf,
    item: usize,
    progress: Option<ProgressSender>,
    semaphore: Option<Arc<Semaphore>>,
) -> Result<()> {
    let _permit = match semaphore.as_ref() {
        Some(semaphore) => Some(
            semaphore
                .acquire()
                .await
                .expect("semaphore is never closed"),
        ),
        None => None,
    };

    let downloaded = downloader.download(&url, &target_dir, progress).await?;
    let working = target_dir.join(format!("{}{item}", archive::TEMP_DIR_PREFIX));
    repackager.repackage(&downloaded.path, &working, None).await?;
    Ok(())
}

/// Creates the target directory, refusing to reuse an existing one
fn create_target_dir(target_dir: &Path) -> Result<()> {
    std::fs::create_dir(target_dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            AppError::DirectoryExists {
                path: target_dir.to_path_buf(),
            }
        } else {
            AppError::Io(e)
        }
    })
}
