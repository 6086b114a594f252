use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

/// Install the global subscriber, writing to stderr.
///
/// A verbosity flag wins over everything else. Without one, `RUST_LOG` is used,
/// then the configured filter, then `info`.
pub fn configure_logging(verbose: bool, debug: bool, quiet: bool, configured: Option<&str>) {
    let level = if quiet {
        Some(Level::ERROR)
    } else if debug {
        Some(Level::DEBUG)
    } else if verbose {
        Some(Level::TRACE)
    } else {
        None
    };

    let filter = match level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or("info"))),
    };

    registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
