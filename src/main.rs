use clap::Parser;
use log::error;

use dataset_search::cli::{Cli, dispatch};
use dataset_search::error::{ConfigError, SchemaError, SourceError};
use dataset_search::logging::init_logging;
use dataset_search::util::envfile::load_dotenv_if_present;

fn main() {
    // .env must be applied before clap reads env fallbacks
    let dotenv = load_dotenv_if_present();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match dotenv {
        Ok(keys) if !keys.is_empty() => log::debug!("Loaded from .env: {}", keys.join(", ")),
        Ok(_) => {}
        Err(e) => log::warn!("Ignoring unreadable .env: {:#}", e),
    }

    if let Err(e) = dispatch(&cli) {
        error!("{:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// 2 for problems with what the user asked for, 1 for failures while doing it.
fn exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<ConfigError>().is_some()
        || e.downcast_ref::<SchemaError>().is_some()
        || matches!(
            e.downcast_ref::<SourceError>(),
            Some(SourceError::UnsupportedFormat { .. })
        )
    {
        2
    } else {
        1
    }
}
