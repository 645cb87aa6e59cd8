//! ziprepack CLI binary
//!
//! Parses arguments, initializes logging, and runs the pipeline. Any fatal
//! error (including a usage error) is printed to stderr and exits with
//! code 1.

use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ziprepack::cli::{self, Args};

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version exit 0; usage errors exit 1, not
            // clap's default 2
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            process::exit(1);
        }
    };

    init_logging(&args);

    if let Err(e) = cli::run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(args: &Args) {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ziprepack={}", args.log_level()).parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(args.very_verbose)
        .init();
}
