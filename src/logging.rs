use log::LevelFilter;

/// Initialize env_logger. `RUST_LOG` wins when set; otherwise the default is `info`,
/// raised to `debug` by `verbose` or lowered to `warn` by `quiet`.
pub fn init_logging(verbose: bool, quiet: bool) {
    let default = default_level(verbose, quiet);
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default.as_str().to_ascii_lowercase()),
    );
    builder.format_timestamp_secs();
    let _ = builder.try_init();
}

pub fn default_level(verbose: bool, quiet: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}
