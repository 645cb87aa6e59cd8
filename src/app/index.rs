//! Index page link extraction
//!
//! Scans the index page for anchors carrying the localized "download"
//! marker and a zip href, and resolves each href against the page URL.
//! A href that does not parse is skipped, never fatal.

use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use crate::constants::index;

/// Extracts candidate archive URLs from the index page, in document order
pub fn extract_archive_urls(html: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(index::DOWNLOAD_LINK_SELECTOR).expect("download link selector is valid");

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            match base.join(href) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("skipping malformed href {href:?}: {e}");
                    None
                }
            }
        })
        .collect()
}
