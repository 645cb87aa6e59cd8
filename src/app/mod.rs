//! Core application layer
//!
//! - [`resolver`] - DNS-over-HTTPS resolver cache
//! - [`client`] - HTTP client pinned to the resolver
//! - [`download`] - streaming downloads with progress snapshots
//! - [`repack`] - external-tool repackaging
//! - [`index`] - index page link extraction
//! - [`pipeline`] - orchestration and fan-out

pub mod client;
pub mod download;
pub mod index;
pub mod pipeline;
pub mod repack;
pub mod resolver;

pub use client::{ClientConfig, PinnedClient};
pub use download::{DownloadedFile, Downloader, ProgressSender, ProgressSnapshot};
pub use pipeline::{Pipeline, PipelineConfig};
pub use repack::{Repackager, Toolchain, XzToolchain};
pub use resolver::DohResolver;
