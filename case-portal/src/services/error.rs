use portal_core::error::AppError;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the hosted auth/database service.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Hosted backend request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Hosted backend timed out")]
    Timeout,

    #[error("Hosted backend returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Failed to decode hosted backend response: {0}")]
    Decode(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl BackendError {
    /// The service understood the request and refused it (bad or expired
    /// credentials), as opposed to being unreachable.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BackendError::Status { status, .. }
                if *status == StatusCode::BAD_REQUEST
                    || *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::FORBIDDEN
        )
    }

    /// Message reported by the service, if any.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => AppError::NotFound(anyhow::anyhow!("{} not found", what)),
            BackendError::Timeout => AppError::UpstreamTimeout,
            BackendError::Status { status, message } if status == StatusCode::FORBIDDEN => {
                AppError::Forbidden(anyhow::anyhow!(message))
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}
