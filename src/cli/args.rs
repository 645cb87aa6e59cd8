//! Command-line argument parsing for ziprepack

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::constants::index;

/// ziprepack - fetch indexed zip archives and repack them as tar.xz
#[derive(Parser, Debug)]
#[command(
    name = "ziprepack",
    version,
    about = "Download the zip archives listed on an index page and repack each as tar.xz",
    long_about = "Downloads every zip archive linked from an index page over connections pinned \
to DNS-over-HTTPS resolved addresses, then repackages each one into a single tar.xz using \
unar, tar and xz."
)]
pub struct Args {
    /// Directory to create and populate (relative to the current directory)
    #[arg(value_name = "DIR")]
    pub target_dir: PathBuf,

    /// Index page listing the downloadable archives
    #[arg(long, value_name = "URL", default_value = index::INDEX_URL)]
    pub index_url: Url,

    /// Maximum number of archives processed at once (default: no limit)
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,
}

impl Args {
    /// Log level derived from the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.very_verbose {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}
