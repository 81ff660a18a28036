//! Command-line interface for the concierge binary.

mod commands;
mod run;

pub use commands::{Cli, Commands};
pub use run::{load_config, run_command};
