//! ade-rooms CLI application
//!
//! Command-line interface for querying live room availability from the ADE
//! Direct Planning timetable platform.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use ade_rooms::cli::{handle_free, handle_info, handle_refresh, handle_rooms, Cli, Commands};
use ade_rooms::config::AppConfig;
use ade_rooms::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(&cli);

    info!("ade-rooms v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_or_default(cli.global.config.clone()).await?;

    // Execute the appropriate command
    match cli.command {
        Commands::Free(args) => {
            info!("Executing free command");
            handle_free(args, &config).await
        }
        Commands::Rooms(args) => {
            info!("Executing rooms command");
            handle_rooms(args, &config).await
        }
        Commands::Refresh(args) => {
            info!("Executing refresh command");
            handle_refresh(args, &config).await
        }
        Commands::Info => {
            info!("Executing info command");
            handle_info(&config).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    // Create environment filter
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ade_rooms={}", log_level).parse().unwrap());

    // Initialize subscriber
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
