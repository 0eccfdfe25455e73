use browserless_client::BrowserlessError;
use omdb_client::OmdbError;
use wikimedia_client::WikimediaError;

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Coarse classification of a [`ResolveError`].
///
/// `NotFound` and `Ambiguous` are anticipated and end up inside a
/// `ResolutionResult`; `Transient` and `Corrupt` abort the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Ambiguous,
    Transient,
    Corrupt,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{0}")]
    NotFound(String),

    #[error("Entity {entity} has conflicting {property} values: {}", .values.join(", "))]
    Ambiguous {
        entity: String,
        property: String,
        values: Vec<String>,
    },

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Timeout occurred after {timeout_ms}ms loading {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Corrupt data for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound(_) => ErrorKind::NotFound,
            ResolveError::Ambiguous { .. } => ErrorKind::Ambiguous,
            ResolveError::Transient(_) | ResolveError::Timeout { .. } => ErrorKind::Transient,
            ResolveError::Corrupt { .. } | ResolveError::Storage { .. } => ErrorKind::Corrupt,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Anticipated failures that become an unconfident result instead of
    /// aborting the thread.
    pub fn is_recordable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Ambiguous)
    }

    pub fn corrupt(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ResolveError::Corrupt {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(path: &std::path::Path, source: std::io::Error) -> Self {
        ResolveError::Storage {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<OmdbError> for ResolveError {
    fn from(err: OmdbError) -> Self {
        if err.is_transient() {
            return ResolveError::Transient(err.to_string());
        }
        match err {
            OmdbError::Parse(reason) => ResolveError::corrupt("catalog response", reason),
            other => ResolveError::NotFound(other.to_string()),
        }
    }
}

impl From<WikimediaError> for ResolveError {
    fn from(err: WikimediaError) -> Self {
        if err.is_transient() {
            return ResolveError::Transient(err.to_string());
        }
        match err {
            WikimediaError::Parse(reason) => ResolveError::corrupt("wikimedia response", reason),
            other => ResolveError::NotFound(other.to_string()),
        }
    }
}

impl From<BrowserlessError> for ResolveError {
    fn from(err: BrowserlessError) -> Self {
        match err {
            BrowserlessError::Timeout { url, timeout_ms } => ResolveError::Timeout { url, timeout_ms },
            other if other.is_transient() => ResolveError::Transient(other.to_string()),
            other => ResolveError::NotFound(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_kinds() {
        let e: ResolveError = OmdbError::Network("reset".into()).into();
        assert_eq!(e.kind(), ErrorKind::Transient);

        let e: ResolveError = OmdbError::Parse("eof".into()).into();
        assert_eq!(e.kind(), ErrorKind::Corrupt);

        let e: ResolveError = WikimediaError::Api {
            status: 404,
            message: "gone".into(),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::NotFound);

        let e: ResolveError = WikimediaError::Api {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert!(e.is_transient());
    }

    #[test]
    fn browser_timeout_keeps_its_own_reason() {
        let e: ResolveError = BrowserlessError::Timeout {
            url: "https://www.goodreads.com/book/show/1".into(),
            timeout_ms: 10_000,
        }
        .into();
        assert!(e.is_transient());
        assert!(e.to_string().starts_with("Timeout occurred"));
    }

    #[test]
    fn only_anticipated_failures_are_recordable() {
        assert!(ResolveError::NotFound("x".into()).is_recordable());
        assert!(ResolveError::Ambiguous {
            entity: "Q1".into(),
            property: "P345".into(),
            values: vec!["tt0000001".into(), "tt0000002".into()],
        }
        .is_recordable());
        assert!(!ResolveError::Transient("x".into()).is_recordable());
        assert!(!ResolveError::corrupt("k", "bad").is_recordable());
    }
}
