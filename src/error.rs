use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::key_parser::ParseError;
use crate::services::materializer::MaterializeError;
use crate::services::policy::PolicyError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    Parse(#[from] ParseError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Policy(#[from] PolicyError),

    #[error("Materialization failed: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Parse(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Policy(_) => StatusCode::FORBIDDEN,
            AppError::Materialize(MaterializeError::OriginalNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Materialize(MaterializeError::Storage(StorageError::InvalidKey(_))) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Materialize(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Parse(e) => e.to_string(),
            AppError::Policy(e) => e.to_string(),
            AppError::Materialize(MaterializeError::OriginalNotFound(_)) => {
                ParseError::MissingKey.to_string()
            }
            AppError::Materialize(MaterializeError::Storage(e @ StorageError::InvalidKey(_))) => {
                e.to_string()
            }
            AppError::Materialize(_) => "Failed to generate image variant".to_string(),
            AppError::BadRequest(msg) | AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error response: {} - {}", status, self);
        } else {
            tracing::warn!("Error response: {} - {}", status, self);
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
