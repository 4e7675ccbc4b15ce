// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use snoozescan::i18n;

mod cli;

use cli::ScanArgs;

#[derive(Parser)]
#[command(name = "snoozescan")]
#[command(about = "Scan a QR code to set or verify an alarm's disarm code")]
#[command(version)]
#[command(subcommand_required = false)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    scan: ScanArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan in terminal mode (renders the camera preview to the terminal)
    Scan(ScanArgs),

    /// Scan without a UI and print the outcome
    Headless {
        #[command(flatten)]
        scan: ScanArgs,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available cameras
    List,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=snoozescan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    // Get the system's preferred languages.
    let requested_languages = i18n_embed::DesktopLanguageRequester::requested_languages();

    // Enable localizations to be applied.
    i18n::init(&requested_languages);

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scan(scan)) => cli::scan(scan),
        Some(Commands::Headless { scan, json }) => cli::run_headless(scan, json),
        Some(Commands::List) => cli::list_cameras(),
        None => cli::scan(cli.scan),
    }
}
