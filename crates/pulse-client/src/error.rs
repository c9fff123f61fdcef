use pulse_api_types::Collection;
use thiserror::Error;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Failure of a single data-source call.
///
/// Every variant is recoverable at the service boundary: the service falls
/// back to synthetic data instead of handing these to consumers.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Transport-level failure: connection refused, DNS, TLS, timeout.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The body was not valid JSON for the expected type, or failed
    /// semantic validation.
    #[error("decode error: {0}")]
    Decode(String),

    /// A deliberate failure from the synthetic source's fault injection.
    #[error("injected fault: {0}")]
    FaultInjected(String),
}

impl FetchError {
    /// Client errors (4xx) are not worth repeating; everything else is.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { status, .. } => !(400..500).contains(status),
            _ => true,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Network("request timed out".into())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

/// The only error the data service surfaces: the local dataset itself
/// could not be produced.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("synthetic data unavailable for {collection}: {source}")]
    SyntheticUnavailable {
        collection: Collection,
        #[source]
        source: FetchError,
    },
}

impl ServiceError {
    pub fn collection(&self) -> Collection {
        match self {
            ServiceError::SyntheticUnavailable { collection, .. } => *collection,
        }
    }
}
