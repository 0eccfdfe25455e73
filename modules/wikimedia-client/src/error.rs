use thiserror::Error;

pub type Result<T> = std::result::Result<T, WikimediaError>;

#[derive(Debug, Error)]
pub enum WikimediaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WikimediaError {
    pub fn is_transient(&self) -> bool {
        match self {
            WikimediaError::Network(_) => true,
            WikimediaError::Api { status, .. } => *status == 429 || *status >= 500,
            WikimediaError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for WikimediaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WikimediaError::Parse(err.to_string())
        } else {
            WikimediaError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WikimediaError {
    fn from(err: serde_json::Error) -> Self {
        WikimediaError::Parse(err.to_string())
    }
}
