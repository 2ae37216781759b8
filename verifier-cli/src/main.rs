//! Verifier CLI
//!
//! Looks up who verified an item, backed by the persistent verifier cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::future::join_all;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use verifier_core::types::{LookupKey, Resolution, Variant};
use verifier_resolver::{ResolverConfig, VerifierResolver};

/// Default cache directory when neither `--cache-dir` nor `VERIFIER_CACHE_DIR` is set.
const DEFAULT_CACHE_DIR: &str = ".verifier";

/// Verifier - cached verification lookups
#[derive(Parser)]
#[command(name = "verifier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the cache file
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Lookup service base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one or more keys (e.g. `1000` or `1000_2p`)
    Lookup {
        /// Keys to resolve
        #[arg(required = true)]
        keys: Vec<String>,
        /// Treat bare keys as their two-player variant
        #[arg(long)]
        two_player: bool,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached records
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop all cached records and delete the cache file
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "verifier=debug,info"
    } else {
        "verifier=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = build_config(&cli);
    debug!(base_url = %config.base_url, cache_dir = ?config.cache_dir, "Configuration loaded");
    let resolver = VerifierResolver::open(config)
        .await
        .context("Failed to open resolver")?;

    match cli.command {
        Commands::Lookup { keys, two_player } => cmd_lookup(&resolver, &keys, two_player).await,
        Commands::Cache { action } => match action {
            CacheAction::Show { json } => cmd_cache_show(&resolver, json),
            CacheAction::Clear => cmd_cache_clear(&resolver).await,
        },
    }
}

fn build_config(cli: &Cli) -> ResolverConfig {
    let mut config = ResolverConfig::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.clone());
    }
    let cache_dir = cli
        .cache_dir
        .clone()
        .or_else(|| config.cache_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    config.with_cache_dir(cache_dir)
}

fn parse_key(raw: &str, two_player: bool) -> Result<LookupKey> {
    let key: LookupKey = raw.parse().with_context(|| format!("Invalid key: {}", raw))?;
    if two_player && key.variant() == Variant::Standard {
        return Ok(LookupKey::new(key.base(), Variant::TwoPlayer)?);
    }
    Ok(key)
}

/// Resolve keys concurrently
async fn cmd_lookup(resolver: &VerifierResolver, raw_keys: &[String], two_player: bool) -> Result<()> {
    let keys = raw_keys
        .iter()
        .map(|raw| parse_key(raw, two_player))
        .collect::<Result<Vec<_>>>()?;

    let resolutions = join_all(keys.iter().cloned().map(|key| resolver.resolve(key))).await;

    for (key, resolution) in keys.iter().zip(resolutions) {
        println!("{} {}", format!("{}:", key).cyan().bold(), describe(&resolution));
        if let Some(url) = resolution.record().and_then(|r| r.proof_url.as_deref()) {
            println!("   {} {}", "Proof:".dimmed(), url);
        }
    }

    Ok(())
}

/// One-line summary of a lookup outcome.
fn describe(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Verified(record) => {
            let names = record.credited_display().unwrap_or_default();
            let legacy = if record.legacy { " (legacy)" } else { "" };
            format!("Verified by: {}{}", names, legacy).green().to_string()
        }
        Resolution::NotFound(_) => "Not found".yellow().to_string(),
        Resolution::Unavailable => "Temporarily unavailable".red().to_string(),
    }
}

fn cmd_cache_show(resolver: &VerifierResolver, json: bool) -> Result<()> {
    let entries = resolver.entries();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let stats = resolver.stats();
    if let Some(path) = resolver.cache_path() {
        println!("{} {}", "Cache file:".dimmed(), path.display());
    }
    println!(
        "{} {} total, {} verified, {} not found ({} stale)",
        "Entries:".cyan().bold(),
        stats.total_entries,
        stats.positive_entries,
        stats.negative_entries,
        stats.expired_entries
    );

    for record in &entries {
        let shown = record
            .credited_display()
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<16} {:<32} {}",
            record.key.to_string(),
            shown,
            record.fetched_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }

    Ok(())
}

async fn cmd_cache_clear(resolver: &VerifierResolver) -> Result<()> {
    resolver.clear_cache().await.context("Failed to clear cache")?;
    println!("{}", "Cache cleared".green());
    Ok(())
}
