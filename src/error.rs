use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with that email already exists")]
    DuplicateUser,

    #[error("Role with that name already exists")]
    DuplicateRole,

    #[error("Failed to hash password")]
    HashingError,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Unauthorized,

    #[error("No push subscriptions found")]
    NoSubscriptions,

    #[error("No collection scheduled for tomorrow")]
    NoScheduleTomorrow,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Push notifications are not configured")]
    PushUnavailable,

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::DuplicateUser,
            other => AppError::Store(other),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::DuplicateUser | AppError::DuplicateRole => StatusCode::CONFLICT,
            AppError::NoSubscriptions | AppError::NoScheduleTomorrow | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PushUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::HashingError | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Store(err) => {
                tracing::error!(error = %err, "store failure");
                "Internal error".to_string()
            }
            AppError::Internal(message) => {
                tracing::error!(%message, "internal failure");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
