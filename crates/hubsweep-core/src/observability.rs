//! Logging setup and span helpers.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at process start-up. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// `RUST_LOG` controls levels (e.g. `info`, `hubsweep_gc=debug`); the default
/// is `info`.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // Test harnesses may have installed a subscriber already.
        let _ = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init(),
        };
    });
}

/// Span wrapping one sweep run.
///
/// `kind` is `snapshot` or `volume`.
#[must_use]
pub fn sweep_span(kind: &str, cluster: &str, dry_run: bool) -> Span {
    tracing::info_span!("sweep", kind = kind, cluster = cluster, dry_run = dry_run)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn sweep_span_can_be_entered() {
        let span = sweep_span("snapshot", "osl-daac", true);
        let _guard = span.enter();
        tracing::info!("message in sweep span");
    }
}
