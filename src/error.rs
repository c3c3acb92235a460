use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("MP_ACCESS_TOKEN not set (nor legacy Access_Token)")]
    MissingToken,

    #[error("access token is not a production token (expected APP_USR- prefix)")]
    NonProductionToken,
}

/// Errors surfaced by a `PaymentProvider` call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider rejected credentials (401 Unauthorized)")]
    Unauthorized,

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Authorization failures can never be retried within a pass.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ProviderError::Unauthorized)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}
