//! curator: build and check YAML manifests of ROOT datasets
//!
//! The library side of the CLI is exposed for testing.

pub mod commands;
pub mod common;
pub mod errors;

pub use common::GlobalOpts;
pub use errors::CliError;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the tracing filter
pub const LOG_ENV_VAR: &str = "CURATOR_LOG";

/// Route `tracing` events from the library crates to stderr
///
/// The filter comes from `CURATOR_LOG` when set, otherwise from the verbosity
/// the logger was initialized with.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| curator_logger::verbosity_to_filter().into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
