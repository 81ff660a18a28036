//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query a booking service through the rate-limited, caching client.
#[derive(Parser, Debug)]
#[command(name = "concierge")]
#[command(about = "Rate-limited, retrying, caching client for a booking REST service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ~/.config/concierge and ./concierge.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Show the company profile
    Company,

    /// List bookable services
    Services,

    /// List staff, optionally limited to one service
    Staff {
        /// Only staff offering this service
        #[arg(long)]
        service: Option<u64>,
    },

    /// Show dates with open slots
    Dates {
        /// Staff member
        #[arg(long)]
        staff: Option<u64>,

        /// Service
        #[arg(long)]
        service: Option<u64>,
    },

    /// Show open time slots for a staff member on a date
    Slots {
        /// Staff member
        staff: u64,

        /// Date (YYYY-MM-DD)
        date: String,

        /// Service
        #[arg(long)]
        service: Option<u64>,
    },

    /// List existing bookings
    Bookings {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Staff member
        #[arg(long)]
        staff: Option<u64>,

        /// Page number
        #[arg(long)]
        page: Option<u32>,
    },

    /// Search clients by phone or name
    Clients {
        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Full or partial name
        #[arg(long)]
        name: Option<String>,
    },

    /// Fetch the company profile repeatedly and print client statistics
    Stats {
        /// Number of requests to issue
        #[arg(long, default_value_t = 2)]
        probes: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slots_with_global_flags() {
        let cli = Cli::try_parse_from([
            "concierge",
            "slots",
            "7",
            "2024-05-01",
            "--service",
            "3",
            "--verbose",
            "--config",
            "local.toml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));
        assert_eq!(
            cli.command,
            Commands::Slots {
                staff: 7,
                date: "2024-05-01".to_string(),
                service: Some(3),
            }
        );
    }

    #[test]
    fn test_stats_default_probes() {
        let cli = Cli::try_parse_from(["concierge", "stats"]).unwrap();
        assert_eq!(cli.command, Commands::Stats { probes: 2 });
    }

    #[test]
    fn test_slots_requires_date() {
        assert!(Cli::try_parse_from(["concierge", "slots", "7"]).is_err());
    }
}
