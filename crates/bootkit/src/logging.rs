use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{Error, Result};

pub const LOG_ENV: &str = "BOOTKIT_LOG";

/// Sends tracing output to stderr; stdout is reserved for rendered results.
pub fn init(verbose: bool) -> Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec.trim())
            .map_err(|e| Error::msg(format!("invalid {LOG_ENV}: {e}")))?,
        _ => EnvFilter::new(if verbose { "debug" } else { "info" }),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::msg(format!("failed to enable tracing: {e}")))
}
