//! Error types for ziprepack
//!
//! One error enum per component, composed into a top-level [`AppError`].
//! Errors carry enough context (URL, tool name, exit code) to be printed
//! as-is at the CLI boundary.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// DNS-over-HTTPS resolution errors
///
/// `Clone` because a single resolution result is shared between every caller
/// waiting on the same hostname; transport and parse failures are carried as
/// strings for that reason.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// Resolution service answered with a non-200 status
    #[error("DNS-over-HTTPS query for {host} returned HTTP {status}")]
    Status { host: String, status: u16 },

    /// Transport-level failure talking to the resolution service
    #[error("DNS-over-HTTPS query for {host} failed: {message}")]
    Transport { host: String, message: String },

    /// Response body was not valid dns-json
    #[error("malformed DNS-over-HTTPS response for {host}: {message}")]
    Json { host: String, message: String },

    /// Response carried no A record answers
    #[error("no A record answer for {host}")]
    NoAnswer { host: String },

    /// First answer's data field was not an IPv4 address
    #[error("answer for {host} is not an IPv4 address: {data}")]
    BadAddress { host: String, data: String },
}

/// Pinned HTTP client errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Server answered with a status other than 200
    #[error("[{status}] getting {url} has failed")]
    Status { status: u16, url: Url },

    /// Transport-level request failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Streaming download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// URL path ends without a usable file name
    #[error("{url} has no usable file name in its path")]
    EmptyFileName { url: Url },

    /// Response content-type is not the expected archive media type
    #[error("{url} is not a zip file (content-type: {content_type})")]
    NotAZip { url: Url, content_type: String },

    /// Response carried no parsable content-length
    #[error("{url} has no parsable content-length")]
    MissingLength { url: Url },

    /// Destination path already exists; downloads never overwrite
    #[error("destination file already exists: {path}")]
    FileExists { path: PathBuf },

    /// Underlying HTTP failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// File I/O error while writing the download
    #[error("file I/O error during download")]
    Io(#[from] std::io::Error),
}

/// Repackaging errors
#[derive(Error, Debug)]
pub enum RepackError {
    /// External tool exited with a non-zero code
    #[error("{tool} exited with non-zero code {code}")]
    ToolFailed { tool: String, code: i32 },

    /// External tool was killed by a signal
    #[error("{tool} was terminated by a signal")]
    ToolTerminated { tool: String },

    /// Input path has no file name to derive the output name from
    #[error("cannot derive an archive name from {path}")]
    NoFileName { path: PathBuf },

    /// File I/O error around the tool invocations
    #[error("file I/O error during repackaging")]
    Io(#[from] std::io::Error),
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// A required external tool is not on PATH (pre-flight)
    #[error("required tool not found on PATH: {tool}")]
    DependencyMissing { tool: String },

    /// The target working directory already exists (pre-flight)
    #[error("target directory already exists: {path}")]
    DirectoryExists { path: PathBuf },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Repack(#[from] RepackError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A spawned per-item task panicked
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Repackaging result type alias
pub type RepackResult<T> = std::result::Result<T, RepackError>;
