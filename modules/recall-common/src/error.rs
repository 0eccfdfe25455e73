use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecallError {
    #[error("Invalid catalog id: {0}")]
    InvalidCatalogId(String),

    #[error("Invalid ISBN: {0:?}")]
    InvalidIsbn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(String),
}
