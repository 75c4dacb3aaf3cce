use serde::Serialize;
use thiserror::Error;

/// Category of a failed resolution, reported to clients as `errorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidUrl,
    NoMediaFound,
    Timeout,
    NetworkError,
    AccessRestricted,
    Unknown,
}

impl ErrorKind {
    /// HTTP status used when this kind is returned from a route.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidUrl => 400,
            ErrorKind::AccessRestricted => 403,
            ErrorKind::NoMediaFound => 404,
            ErrorKind::NetworkError => 502,
            ErrorKind::Timeout => 504,
            ErrorKind::Unknown => 500,
        }
    }
}

/// Failure reported by a [`crate::fetcher::MediaFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("content is private or restricted: {0}")]
    AccessRestricted(String),
    #[error("{0}")]
    Unknown(String),
}

/// Terminal error of a single resolution.
///
/// `Display` renders the message shown to end users verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Invalid Instagram URL. Please provide a valid Instagram post, reel, or video link.")]
    InvalidUrl,
    #[error("No downloadable media found from this link.")]
    NoMediaFound,
    #[error("{}", fetch_message(.0))]
    Fetch(#[from] FetchError),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::InvalidUrl => ErrorKind::InvalidUrl,
            ResolveError::NoMediaFound => ErrorKind::NoMediaFound,
            ResolveError::Fetch(FetchError::Timeout) => ErrorKind::Timeout,
            ResolveError::Fetch(FetchError::Network(_)) => ErrorKind::NetworkError,
            ResolveError::Fetch(FetchError::AccessRestricted(_)) => ErrorKind::AccessRestricted,
            ResolveError::Fetch(FetchError::Unknown(_)) => ErrorKind::Unknown,
        }
    }
}

fn fetch_message(err: &FetchError) -> String {
    match err {
        FetchError::Timeout => "Request timeout. Please try again.".to_string(),
        FetchError::Network(_) => "Network error. Please check your connection.".to_string(),
        FetchError::AccessRestricted(_) => "This content is private or restricted.".to_string(),
        FetchError::Unknown(detail) => format!("Download failed: {detail}"),
    }
}
