use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tablestate::TableError;

const DEFAULT_FILTER: &str = "info";

/// The terminal belongs to the table, so log lines only go to a file when one is given.
/// `RUST_LOG` overrides the default filter.
pub fn init(log_file: Option<&Path>) -> Result<(), TableError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(File::create(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
