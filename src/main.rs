//! amdify - wrap CommonJS npm packages as AMD modules.
//!
//! This is the main entry point for the amdify binary.

use std::path::{Path, PathBuf};

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amdify::cache::PersistentCache;
use amdify::cli::{BuildArgs, CacheCommands, Cli, Commands};
use amdify::config::ProjectConfig;
use amdify::error::Result;
use amdify::transform::CjsTransform;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Build(args) => run_build(args, &cli).await,
        Commands::Cache(args) => match args.command {
            CacheCommands::Dir => {
                let cache = PersistentCache::new(cli.cache_dir.clone())?;
                println!("{}", cache.root().display());
                Ok(())
            }
            CacheCommands::Clear => {
                let cache = PersistentCache::new(cli.cache_dir.clone())?;
                cache.clear().await?;
                println!("{} cache cleared", "done:".green().bold());
                Ok(())
            }
        },
    }
}

async fn run_build(args: &BuildArgs, cli: &Cli) -> Result<()> {
    let config = ProjectConfig::load(&args.config)?;

    let project_root = config
        .project_root
        .clone()
        .unwrap_or_else(|| config_dir(&args.config));
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| project_root.join(&config.output));

    let options = config.to_options()?;
    let cache_root = cli.cache_dir.clone().or_else(|| config.cache_dir.clone());
    let cache = PersistentCache::new(cache_root)?;

    let mut transform =
        CjsTransform::new(&project_root, &project_root, options)?.with_cache(cache);
    if let Some(concurrency) = args.concurrency {
        transform = transform.with_concurrency(concurrency);
    }

    let report = transform.build(&output).await?;

    println!(
        "{} {} module(s) written to {} ({} bundled, {} from cache)",
        "done:".green().bold(),
        report.entries_bundled + report.entries_from_cache,
        output.display(),
        report.entries_bundled,
        report.entries_from_cache
    );
    Ok(())
}

/// The directory the config file lives in, used as the default project root.
fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
