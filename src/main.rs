mod cli;
mod error;
mod models;
mod system;

use clap::Parser;
use cli::App;
use colored::*;
use error::{AppError, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Interactive provisioner for Time Machine sparsebundle disk images.
///
/// Walks through volume name, size, band size, optional AES-256 encryption
/// and destination, then delegates creation to `hdiutil` and (optionally)
/// registration to `tmutil inheritbackup`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // The tool takes no flags of its own; clap still provides --help/--version.
    let _cli = Cli::parse();

    info!("Initializing sparsebundle provisioning...");

    let app = match App::new() {
        Ok(app) => {
            info!("Application initialized successfully.");
            app
        },
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!("{} {}", "Error:".red(), e.to_string().red());
            return Err(e);
        },
    };

    println!(
        "{}",
        "Welcome to the Time Machine sparsebundle provisioner!"
            .cyan()
            .bold()
    );

    match app.run().await {
        Ok(()) => Ok(()),
        Err(AppError::Cancelled) => {
            // A decline at the confirmation gate is voluntary, not a failure.
            println!("{}", "Cancelled. Nothing was created.".yellow());
            std::process::exit(1);
        },
        Err(e) => {
            error!("Provisioning failed: {:?}", e);
            println!("{} {}", "Error:".red(), e.to_string().red());
            std::process::exit(1);
        },
    }
}
