use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "POLYNAV_LOG";

/// Installs a stderr subscriber. `POLYNAV_LOG` overrides the verbosity flag.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
