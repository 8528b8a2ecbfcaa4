//! CLI argument parsing for amdify.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// amdify - wrap CommonJS npm packages as AMD modules with persistent caching
#[derive(Parser, Debug)]
#[command(name = "amdify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Cache directory override
    #[arg(long, global = true, env = "AMDIFY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build all modules declared in amdify.toml
    #[command(alias = "b")]
    Build(BuildArgs),

    /// Manage the transform cache
    Cache(CacheArgs),
}

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Path to the project config file
    #[arg(short, long, default_value = "amdify.toml")]
    pub config: PathBuf,

    /// Output directory override
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of entries to build concurrently (default: CPU count)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Print the cache directory
    Dir,

    /// Delete the entire cache (forces recomputation, never correctness loss)
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_with_overrides() {
        let cli = Cli::try_parse_from([
            "amdify",
            "build",
            "--config",
            "custom.toml",
            "--output",
            "wrapped",
            "--concurrency",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.config, PathBuf::from("custom.toml"));
                assert_eq!(args.output, Some(PathBuf::from("wrapped")));
                assert_eq!(args.concurrency, Some(3));
            }
            other => panic!("expected build, got {other:?}"),
        }
    }

    #[test]
    fn parses_cache_subcommands() {
        let cli = Cli::try_parse_from(["amdify", "cache", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                command: CacheCommands::Clear
            })
        ));
    }
}
