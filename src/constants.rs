//! Application constants for ziprepack
//!
//! Centralizes the constants used throughout the application, organized by
//! functional domain.

use std::time::Duration;

/// DNS-over-HTTPS resolution
pub mod doh {
    use super::Duration;

    /// Default DNS-over-HTTPS endpoint (Cloudflare's dns-json service)
    pub const ENDPOINT: &str = "https://cloudflare-dns.com/dns-query";

    /// Accept header required by the dns-json wire format
    pub const ACCEPT: &str = "application/dns-json";

    /// Timeout for a single resolution query
    pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);
}

/// HTTP client configuration
pub mod http {
    use super::Duration;

    /// User agent sent on every outbound request
    pub const USER_AGENT: &str = concat!("ziprepack/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Archive media types and naming
pub mod archive {
    /// Expected `content-type` prefix for downloaded archives
    pub const ZIP_MEDIA_TYPE: &str = "application/zip";

    /// Extension of the recompressed output archive
    pub const OUTPUT_EXTENSION: &str = "tar.xz";

    /// Prefix for the per-item working subfolders inside the target directory
    pub const TEMP_DIR_PREFIX: &str = "temp-";
}

/// External tool invocations
pub mod tools {
    /// Unarchiver used to unpack downloaded zip files
    pub const UNPACK: &str = "unar";

    /// Archiver used to bundle the working folder
    pub const ARCHIVE: &str = "tar";

    /// Compressor piped through the archiver
    pub const COMPRESS: &str = "xz";

    /// Compression filter handed to `tar -I`: high ratio, all cores
    pub const XZ_FILTER: &str = "xz -9eT 0";

    /// Tools that must be present on PATH before a run starts
    pub const REQUIRED: &[&str] = &[UNPACK, ARCHIVE, COMPRESS];
}

/// Index page scraping
pub mod index {
    /// Default index page listing the downloadable archives
    pub const INDEX_URL: &str = "https://www.epost.go.kr/search/zipcode/areacdAddressDown.jsp";

    /// CSS selector for anchors carrying the localized "download" marker
    /// and pointing at a zip archive
    pub const DOWNLOAD_LINK_SELECTOR: &str = "a[title='다운로드'][href$='.zip']";
}

/// Progress reporting
pub mod progress {
    use super::Duration;

    /// Interval between progress snapshots during a download
    pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5);
}
