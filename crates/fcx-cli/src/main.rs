use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "fcx")]
#[command(about = "Feature combination cache CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand feature tokens into every non-empty combination
    Combos {
        /// Raw tokens; comma-joined entries are split
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Snapshot file utilities
    Cache {
        #[command(subcommand)]
        cmd: CacheCmd,
    },

    /// Run one reconciliation pass against the configured cache
    Reconcile {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Fail when the config carries keys this mode never reads
        #[arg(long, default_value_t = false)]
        strict_keys: bool,
    },
}

#[derive(Subcommand)]
enum CacheCmd {
    /// Print snapshot metadata
    Status {
        #[arg(long)]
        path: PathBuf,
    },

    /// Remove the snapshot file
    Clear {
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Combos { tokens } => {
            let combos = fcx_combos::try_generate(&tokens)?;
            for c in &combos {
                println!("{c}");
            }
            println!("count={}", combos.len());
        }

        Commands::ConfigHash { paths } => {
            let merged = fcx_config::MergedConfig::from_paths(paths.as_slice())?;
            println!("config_hash={}", merged.config_hash);
            println!("{}", merged.canonical_json);
        }

        Commands::Cache { cmd } => match cmd {
            CacheCmd::Status { path } => commands::cache::status(&path)?,
            CacheCmd::Clear { path } => commands::cache::clear(&path)?,
        },

        Commands::Reconcile {
            config_paths,
            strict_keys,
        } => {
            let summary = commands::reconcile::run(&config_paths, strict_keys)?;
            summary.print();
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays `key=value` only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
