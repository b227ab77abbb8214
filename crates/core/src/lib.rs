pub mod config;
pub mod util;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Broad category of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Validation,
    NotFound,
    Upstream,
    Filesystem,
}

/// Failure of a single webhook delivery. Every variant terminates the request
/// with `400 Bad Request` and the message as a plain-text body.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Missing, malformed or incorrect signature.
    #[error("{0}")]
    Authentication(String),
    /// Malformed JSON or unexpected payload shape.
    #[error("{0}")]
    Validation(String),
    /// The requested artifact is absent from the listing.
    #[error("{0}")]
    NotFound(String),
    /// Network failure or non-2xx response from an outbound call.
    #[error("{0}")]
    Upstream(String),
    /// Extraction or directory replacement failed.
    #[error("{0}")]
    Filesystem(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Filesystem(_) => ErrorKind::Filesystem,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::Upstream | ErrorKind::Filesystem => {
                tracing::error!(kind = ?self.kind(), "{self}")
            }
            _ => tracing::warn!(kind = ?self.kind(), "{self}"),
        }
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let errors = [
            SyncError::Authentication("Invalid signature".into()),
            SyncError::Validation("bad json".into()),
            SyncError::NotFound("missing".into()),
            SyncError::Upstream("HTTP 502".into()),
            SyncError::Filesystem("disk full".into()),
        ];
        for err in errors {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(SyncError::NotFound(String::new()).kind(), ErrorKind::NotFound);
        assert_eq!(SyncError::Upstream(String::new()).kind(), ErrorKind::Upstream);
    }
}
