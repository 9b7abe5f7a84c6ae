//! ShardGuard shard registry administration
//!
//! Usage:
//!   shardguard-admin --config shardguard.toml --registry shards.db list
//!   shardguard-admin upsert east --connection DefaultConnection --database east
//!   shardguard-admin resolve --data-key 1.3. --shard east

use anyhow::{Context, Result};
use clap::Parser;
use shardguard_admin::{Admin, Command};
use shardguard_db::{ConnectionSettings, SETTINGS_FILE};
use shardguard_registry::ShardRegistry;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "shardguard-admin")]
#[command(about = "Manage the ShardGuard shard registry")]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = SETTINGS_FILE)]
    config: PathBuf,

    /// Path to the shard registry database
    #[arg(short, long, default_value = "shards.db")]
    registry: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let settings = ConnectionSettings::load_from(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let registry = ShardRegistry::open(&args.registry, &settings)
        .with_context(|| format!("opening shard registry {}", args.registry.display()))?;
    debug!(command = ?args.command, "Running admin command");

    let admin = Admin::new(&settings, registry);
    println!("{}", admin.run(&args.command)?);
    Ok(())
}
