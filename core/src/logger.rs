//! Debug log sinks for request/response tracing.
//!
//! The request handler only ever talks to an `ApiLogger`; with no logger
//! configured nothing is logged.

/// Receives one line per request and one per response.
pub trait ApiLogger: Send + Sync {
    fn log(&self, message: &str);
}

impl<F> ApiLogger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, message: &str) {
        self(message);
    }
}

/// Writes debug lines to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrApiLogger;

impl ApiLogger for StderrApiLogger {
    fn log(&self, message: &str) {
        eprintln!("[flux-api] {message}");
    }
}

/// Forwards debug lines to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogApiLogger;

impl LogApiLogger {
    pub const TARGET: &'static str = "flux_core::requests";
}

impl ApiLogger for LogApiLogger {
    fn log(&self, message: &str) {
        log::debug!(target: Self::TARGET, "{message}");
    }
}
