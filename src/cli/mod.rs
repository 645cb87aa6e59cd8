//! Command-line interface layer

pub mod args;
pub mod commands;
pub mod progress;

pub use args::Args;
pub use commands::run;
