//! # pawmart CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pawmart_cli::admin::{run_create_admin, CreateAdminArgs};
use pawmart_cli::catalog::{run_seed, SeedArgs};
use pawmart_cli::quote::{run_quote, QuoteArgs};

/// PawMart operator CLI.
///
/// Seeds the storefront catalog, prices carts offline, and bootstraps
/// admin accounts.
#[derive(Parser, Debug)]
#[command(name = "pawmart", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upsert products, pets and team members from a YAML catalog.
    Seed(SeedArgs),

    /// Price a YAML cart against a YAML catalog.
    Quote(QuoteArgs),

    /// Create or promote an admin account.
    CreateAdmin(CreateAdminArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Seed(args) => run_seed(&args),
        Commands::Quote(args) => run_quote(&args),
        Commands::CreateAdmin(args) => run_create_admin(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
