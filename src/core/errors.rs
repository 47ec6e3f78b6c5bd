use thiserror::Error;

/// Error type for every public wallet-service operation.
///
/// Each variant carries a short, user-facing message. Secrets (keys, phrases)
/// must never be formatted into these messages.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Empty phrase or failed BIP-39 checksum validation.
    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Enrichment credential missing. Soft signal: callers fall back.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    RequestTimeout(String),

    /// Non-success HTTP status from an upstream API.
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// Upstream body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unable to calculate gas: {0}")]
    EstimationFailed(String),

    #[error("Failed to send transaction: {0}")]
    SubmissionFailed(String),

    /// Both history sources were tried and the last one failed.
    #[error("Failed to fetch transaction history: {0}")]
    HistoryFetchFailed(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    /// Transport failure other than a timeout.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// True when the enriched source could not serve the request and the
    /// indexer should be asked instead.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            WalletError::NotConfigured(_)
                | WalletError::RequestTimeout(_)
                | WalletError::UpstreamError(_)
                | WalletError::MalformedResponse(_)
                | WalletError::Network(_)
        )
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL can carry the provider key.
        let err = err.without_url();
        if err.is_timeout() {
            WalletError::RequestTimeout(err.to_string())
        } else if err.is_decode() {
            WalletError::MalformedResponse(err.to_string())
        } else {
            WalletError::Network(err.to_string())
        }
    }
}
