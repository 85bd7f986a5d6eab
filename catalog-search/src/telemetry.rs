//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::AppError;

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|e| AppError::config(format!("Failed to install tracing subscriber: {}", e)))
}
