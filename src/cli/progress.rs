//! Console progress reporting
//!
//! Receives [`ProgressSnapshot`] values over a channel and prints one line
//! per snapshot: path, MiB written / MiB total, and a percentage. Runs as
//! its own task so printing never slows a transfer.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::download::{ProgressSender, ProgressSnapshot};

/// Spawns the snapshot-printing task
///
/// The task ends when every sender clone has been dropped, i.e. when the
/// pipeline run is over.
pub fn spawn_reporter() -> (ProgressSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressSnapshot>();
    let handle = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            println!("{}", format_snapshot(&snapshot));
        }
    });
    (tx, handle)
}

/// `<path> \t <written> MiB / <total> MiB <percent>%`
pub fn format_snapshot(snapshot: &ProgressSnapshot) -> String {
    let ratio = if snapshot.total == 0 {
        1.0
    } else {
        snapshot.bytes as f64 / snapshot.total as f64
    };
    format!(
        "{} \t {} / {} {}%",
        snapshot.path.display(),
        mib(snapshot.bytes),
        mib(snapshot.total),
        percentage(ratio)
    )
}

/// Bytes as MiB, rounded to two decimals
fn mib(bytes: u64) -> String {
    format!("{} MiB", (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0)
}

/// Ratio as a percentage, rounded to two decimals
fn percentage(ratio: f64) -> f64 {
    (ratio * 10000.0).round() / 100.0
}
