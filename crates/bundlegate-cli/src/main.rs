//! bundlegate CLI
//!
//! Command-line front-end for the bundle gateway

use bundlegate_core::logging_facility;
use bundlegate_engine::{build_gateway, GatewayConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "bundlegate")]
#[command(about = "bundlegate - publish and fetch store bundles", long_about = None)]
struct Cli {
    /// Gateway config file (TOML); environment overrides still apply
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Publish a payload and/or manifest as a bundle
    Insert(commands::insert::InsertArgs),
    /// List bundles known to the store
    List(commands::list::ListArgs),
    /// Write a bundle's payload to stdout or a file
    Cat(commands::cat::CatArgs),
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::load(cli.config.as_deref())?;
    logging_facility::init(config.log_profile);
    let gateway = build_gateway(&config)?;

    match cli.command {
        Commands::Insert(args) => commands::insert::execute(args, &gateway),
        Commands::List(args) => commands::list::execute(args, &gateway),
        Commands::Cat(args) => commands::cat::execute(args, &gateway),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
