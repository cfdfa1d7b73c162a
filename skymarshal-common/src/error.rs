use serde::Serialize;
use thiserror::Error;

/// Tagged error taxonomy shared by every crate in the workspace.
///
/// The variants mirror how failures are routed: `RateLimited` and `Network`
/// are retried inside the client, `Auth` triggers at most one re-auth, and
/// the HTTP facade maps each kind onto a status code.
#[derive(Error, Debug, Clone)]
pub enum SkymarshalError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    RateLimited,
    NotFound,
    Validation,
    Network,
    Storage,
    Conflict,
    Internal,
}

impl SkymarshalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SkymarshalError::Auth(_) => ErrorKind::Auth,
            SkymarshalError::RateLimited(_) => ErrorKind::RateLimited,
            SkymarshalError::NotFound(_) => ErrorKind::NotFound,
            SkymarshalError::Validation(_) => ErrorKind::Validation,
            SkymarshalError::Network(_) => ErrorKind::Network,
            SkymarshalError::Storage(_) => ErrorKind::Storage,
            SkymarshalError::Conflict(_) => ErrorKind::Conflict,
            SkymarshalError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SkymarshalError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, SkymarshalError>;

impl From<std::io::Error> for SkymarshalError {
    fn from(error: std::io::Error) -> Self {
        SkymarshalError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for SkymarshalError {
    fn from(error: serde_json::Error) -> Self {
        SkymarshalError::Storage(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SkymarshalError::Auth("expired".into()).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            SkymarshalError::Conflict("not yours".into()).kind(),
            ErrorKind::Conflict
        );
        assert!(SkymarshalError::Auth("expired".into()).is_auth());
        assert!(!SkymarshalError::Network("timeout".into()).is_auth());
    }
}
