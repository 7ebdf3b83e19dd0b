use thiserror::Error;

/// Failure of a single request against the simulation backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Unauthorized: HTTP {0}")]
    Unauthorized(u16),

    #[error("API error: HTTP {0}")]
    Http(u16),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FetchError::Unauthorized(status),
            _ => FetchError::Http(status),
        }
    }

    /// Whether this failure will not go away by asking again.
    pub fn is_auth(&self) -> bool {
        matches!(self, FetchError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::from_status(status.as_u16());
        }
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_auth() {
        assert_eq!(FetchError::from_status(401), FetchError::Unauthorized(401));
        assert_eq!(FetchError::from_status(403), FetchError::Unauthorized(403));
        assert!(FetchError::from_status(401).is_auth());
    }

    #[test]
    fn test_from_status_other_codes() {
        assert_eq!(FetchError::from_status(500), FetchError::Http(500));
        assert_eq!(FetchError::from_status(404), FetchError::Http(404));
        assert!(!FetchError::from_status(502).is_auth());
    }

    #[test]
    fn test_transport_is_not_auth() {
        assert!(!FetchError::Transport("connection reset".into()).is_auth());
        assert!(!FetchError::Decode("eof".into()).is_auth());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(FetchError::Http(503).to_string(), "API error: HTTP 503");
        assert_eq!(
            AppError::Config("bad base".into()).to_string(),
            "Configuration error: bad base"
        );
    }

    #[test]
    fn test_app_error_from_fetch() {
        let err: AppError = FetchError::Unauthorized(401).into();
        assert!(matches!(err, AppError::Fetch(FetchError::Unauthorized(401))));
    }
}
