use thiserror::Error;

/// Everything that can end a resolution attempt. None of these are retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("error fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("error parsing JSON from {url}: {body}")]
    Parse { url: String, body: String },

    #[error("{what} not found at {url}")]
    NotFound { what: String, url: String },

    #[error("{what} returned empty content for {url}")]
    EmptyResult { what: String, url: String },

    #[error("unsupported url {url}: {reason}")]
    UnsupportedUrl { url: String, reason: String },
}

impl MediaError {
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        MediaError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>, url: impl Into<String>) -> Self {
        MediaError::NotFound {
            what: what.into(),
            url: url.into(),
        }
    }

    pub fn empty(what: impl Into<String>, url: impl Into<String>) -> Self {
        MediaError::EmptyResult {
            what: what.into(),
            url: url.into(),
        }
    }

    pub fn unsupported(url: impl Into<String>, reason: impl Into<String>) -> Self {
        MediaError::UnsupportedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
