//! `tracing` subscriber setup for the command-line tool.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::config::LoggingOptions;

/// Installs the global subscriber, writing to stderr.
///
/// `QRGEN_LOG` has already been folded into `options` by
/// [`StudioConfig::load`](crate::config::StudioConfig::load). Does nothing if
/// a subscriber is already installed.
pub fn init(options: &LoggingOptions) -> anyhow::Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&options.level)
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {e}", options.level))?;

    Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(options.color)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
