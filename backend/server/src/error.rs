use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bank::{credentials::CredentialError, rows::RowError};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Developer access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Chat assistant is not configured")]
    ChatUnavailable,

    #[error("The library is under maintenance, please try again later")]
    Maintenance,

    #[error("Chat assistant failed to respond")]
    Chat(String),

    #[error("Remote store request failed")]
    Store(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RowError> for AppError {
    fn from(error: RowError) -> Self {
        AppError::MalformedPayload(error.to_string())
    }
}

impl From<CredentialError> for AppError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::EmptyPassword => AppError::MalformedPayload(error.to_string()),
            other => AppError::InternalError(Box::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ChatUnavailable | AppError::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Chat(_) | AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // upstream detail stays in the logs
        match &self {
            AppError::Store(e) => error!("Store failure: {e:#}"),
            AppError::Chat(detail) => error!("Chat failure: {detail}"),
            AppError::InternalError(e) => error!("Internal failure: {e}"),
            AppError::InvalidCredentials => warn!("Rejected admin login"),
            _ => {}
        }

        let message = match self {
            AppError::InternalError(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        (status, message).into_response()
    }
}
