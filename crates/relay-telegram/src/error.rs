use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The platform asked us to slow down.
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// The response body did not match the expected shape. Not transient:
    /// retrying a parse failure cannot help.
    #[error("malformed api response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("bot api error {code}: {description}")]
    Api { code: i64, description: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout(error)
        } else if error.is_decode() {
            TransportError::Decode(error)
        } else {
            TransportError::Network(error)
        }
    }
}

impl TransportError {
    /// Rate limits, network failures and timeouts are expected to be common
    /// and short-lived; everything else is fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. }
                | TransportError::Network(_)
                | TransportError::Timeout(_)
        )
    }
}
