mod cli;
mod config;
mod identity;
mod lifecycle;
mod model;
mod policy;
mod storage;

use std::{io, process};

use tracing_subscriber::EnvFilter;

use config::Config;
use storage::Storage;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let path = config.database_path().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let storage = match Storage::open(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open shipment store at {}: {e}", path.display());
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&config, &storage) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}
