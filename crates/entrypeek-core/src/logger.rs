//! Per-request progress logging.
//!
//! A fetch reports a handful of user-facing lines (what it is fetching, which
//! strategy won, why it failed) through a [`FetchLogger`] passed in with the
//! request. Internal diagnostics go through `tracing` regardless.

use std::io::Write;
use std::sync::Arc;

/// Sink for the user-facing lines of a fetch.
pub trait FetchLogger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` at INFO / ERROR.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl FetchLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Writes info lines to stdout and error lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdStreamLogger;

impl FetchLogger for StdStreamLogger {
    fn info(&self, message: &str) {
        let _ = writeln!(std::io::stdout(), "{message}");
    }

    fn error(&self, message: &str) {
        let _ = writeln!(std::io::stderr(), "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl FetchLogger for NoopLogger {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// The logger used when a request does not supply one.
///
/// Writes to the process's standard streams, so a library caller without a
/// `tracing` subscriber still sees progress and failures. Callers that own
/// stdout (the CLI's `--json` mode) pass [`TracingLogger`] instead.
#[must_use]
pub fn default_logger() -> Arc<dyn FetchLogger> {
    Arc::new(StdStreamLogger)
}
