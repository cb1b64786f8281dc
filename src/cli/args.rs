//! Command-line argument parsing
//!
//! This module defines the CLI structure using clap derive macros: snapshot
//! refresh, live free-room queries and per-room schedule inspection.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::ClockTime;

/// ade-rooms - live room availability for the ADE timetable platform
#[derive(Parser, Debug)]
#[command(
    name = "ade-rooms",
    version,
    about = "Find free rooms from the ADE Direct Planning timetable platform",
    long_about = "Scrapes the ADE Direct Planning platform (or its community mirror) for the
current day's room occupancy and reports which rooms are free right now and until when."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List rooms that are free right now
    Free(FreeArgs),

    /// Show the day's schedule for all rooms or one room
    Rooms(RoomsArgs),

    /// Force a fresh scrape, ignoring the snapshot TTL
    Refresh(RefreshArgs),

    /// Show snapshot state, configuration and known room categories
    Info,
}

/// Arguments for the free command
#[derive(Args, Debug, Clone)]
pub struct FreeArgs {
    /// Resolve availability at this time instead of now (e.g. "10h30" or "10:30")
    #[arg(long, value_name = "TIME", value_parser = parse_clock)]
    pub at: Option<ClockTime>,

    /// Only rooms with at least this capacity
    #[arg(short = 'c', long, value_name = "SEATS")]
    pub min_capacity: Option<u32>,

    /// Wait for a fresh snapshot instead of serving a stale one
    #[arg(long)]
    pub fresh: bool,
}

/// Arguments for the rooms command
#[derive(Args, Debug, Clone)]
pub struct RoomsArgs {
    /// Show a single room by number (e.g. "2101")
    #[arg(value_name = "ROOM")]
    pub room: Option<String>,

    /// Decode the whole week instead of just today
    #[arg(long)]
    pub all_days: bool,
}

/// Arguments for the refresh command
#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Number of concurrent room fetches
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<usize>,
}

/// Parse "10h30", "10:30" or "10" into a clock time
fn parse_clock(value: &str) -> Result<ClockTime, String> {
    let (hour, minute) = match value.split_once(['h', ':']) {
        Some((h, m)) => (h, if m.is_empty() { "0" } else { m }),
        None => (value, "0"),
    };
    let hour: u8 = hour
        .parse()
        .map_err(|_| format!("invalid hour in '{value}'"))?;
    let minute: u8 = minute
        .parse()
        .map_err(|_| format!("invalid minute in '{value}'"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("'{value}' is not a valid time of day"));
    }
    Ok(ClockTime::new(hour, minute))
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_parsing_accepts_both_separators() {
        assert_eq!(parse_clock("10h30").unwrap(), ClockTime::new(10, 30));
        assert_eq!(parse_clock("10:30").unwrap(), ClockTime::new(10, 30));
        assert_eq!(parse_clock("8h").unwrap(), ClockTime::new(8, 0));
        assert_eq!(parse_clock("8").unwrap(), ClockTime::new(8, 0));
    }

    #[test]
    fn test_clock_parsing_rejects_out_of_range() {
        assert!(parse_clock("24h00").is_err());
        assert!(parse_clock("10h60").is_err());
        assert!(parse_clock("midi").is_err());
    }

    #[test]
    fn test_log_level() {
        let cli_quiet = Cli {
            global: GlobalArgs {
                verbose: false,
                very_verbose: false,
                quiet: true,
                config: None,
            },
            command: Commands::Info,
        };

        let cli_verbose = Cli {
            global: GlobalArgs {
                verbose: true,
                very_verbose: false,
                quiet: false,
                config: None,
            },
            command: Commands::Info,
        };

        assert_eq!(cli_quiet.log_level(), tracing::Level::ERROR);
        assert_eq!(cli_verbose.log_level(), tracing::Level::INFO);
    }
}
