mod cli;
mod cmd;

use std::path::PathBuf;

use clap::Parser;

use packread_core::config::{load_config, CONFIG_ENV_VAR};
use packread_core::StreamConfig;
use packread_types::error::Result;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match resolve_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Stream {
            repo,
            key,
            pack,
            blobs,
            out,
        } => {
            let blobs: Vec<_> = blobs.into_iter().map(|spec| spec.0).collect();
            match cmd::stream::run_stream(&config, &repo, &key, &pack, &blobs, out.as_deref()) {
                Ok(0) => {}
                Ok(failed) => {
                    eprintln!("Error: {failed} of {} blobs could not be read", blobs.len());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Sort { cache, candidates } => {
            if let Err(e) = cmd::sort::run_sort(&cache, &candidates) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}

/// `--config` wins over `$PACKREAD_CONFIG`; with neither, defaults apply.
fn resolve_config(explicit: Option<&str>) -> Result<StreamConfig> {
    let path = explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    match path {
        Some(path) => {
            tracing::info!("Using config: {}", path.display());
            load_config(&path)
        }
        None => Ok(StreamConfig::default()),
    }
}
