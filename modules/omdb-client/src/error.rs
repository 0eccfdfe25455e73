use thiserror::Error;

pub type Result<T> = std::result::Result<T, OmdbError>;

#[derive(Debug, Error)]
pub enum OmdbError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Lookup rejected: {0}")]
    Rejected(String),
}

impl OmdbError {
    pub fn is_transient(&self) -> bool {
        match self {
            OmdbError::Network(_) => true,
            OmdbError::Api { status, .. } => *status == 429 || *status >= 500,
            OmdbError::Parse(_) | OmdbError::Rejected(_) => false,
        }
    }
}

impl From<reqwest::Error> for OmdbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OmdbError::Parse(err.to_string())
        } else {
            OmdbError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OmdbError {
    fn from(err: serde_json::Error) -> Self {
        OmdbError::Parse(err.to_string())
    }
}
