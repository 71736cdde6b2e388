use feed::ParseError;
use reqwest::StatusCode;

/// Why a poll cycle failed.
///
/// `Network`, `Http` and `Parse` are recovered inside the monitor and drive its
/// backoff; `Exhausted` marks a provider that keeps failing beyond the retry budget.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Connection, DNS, timeout or body read failure.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// The server answered with a status other than 2xx or 304.
    #[error("unexpected HTTP status {status}")]
    Http {
        /// Status returned by the feed server
        status: StatusCode,
    },
    /// The body is not a well-formed feed of the configured dialect.
    #[error("feed parse error: {0}")]
    Parse(#[from] ParseError),
    /// Consecutive failures went past the configured retry budget.
    #[error("provider exhausted after {failures} consecutive failures")]
    Exhausted {
        /// Consecutive failures so far
        failures: u32,
    },
}

impl MonitorError {
    /// Short machine-friendly label used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Parse(_) => "parse",
            Self::Exhausted { .. } => "exhausted",
        }
    }
}
