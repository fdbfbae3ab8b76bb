use anyhow::Result;
use doublecheck::cli::{self, Commands};
use doublecheck::commands::VerifyConfig;
use doublecheck::config::{load_config, load_config_file, Configuration};
use std::io;
use tracing_subscriber::EnvFilter;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(2);
        }
    }
}

// Returns whether verification passed
fn run() -> Result<bool> {
    let cli = cli::parse_args();

    let config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config(),
    };
    init_logging(&config);

    match cli.command {
        Commands::Infer { calls, format } => {
            doublecheck::commands::infer(&calls, format)?;
            Ok(true)
        }
        Commands::Verify {
            real,
            mocks,
            type_check,
            sig_dir,
            no_contracts,
        } => {
            let verify_config = VerifyConfig {
                real,
                mocks,
                type_check,
                sig_dirs: sig_dir,
                contracts: !no_contracts,
                raise_on_missing_auto_types: config.raise_on_missing_auto_types,
            };
            doublecheck::commands::verify(&verify_config)
        }
        Commands::CheckSigs { dir } => {
            doublecheck::commands::check_sigs(&dir)?;
            Ok(true)
        }
        Commands::Init { force } => {
            doublecheck::commands::init_config(force)?;
            Ok(true)
        }
    }
}

// Harness records go through env_logger; pass spans go to a tracing
// subscriber filtered by RUST_LOG.
fn init_logging(config: &Configuration) {
    doublecheck::logging::init(config);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::debug!("Tracing subscriber already installed");
    }
}
