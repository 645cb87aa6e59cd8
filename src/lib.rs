//! ziprepack library
//!
//! Discovers zip archives listed on a remote index page, downloads each one
//! over connections pinned to DNS-over-HTTPS resolved addresses, and
//! repackages every download into a single `.tar.xz` using external tools.

pub mod app;
pub mod cli;
pub mod constants;
pub mod errors;

pub use errors::{AppError, Result};
