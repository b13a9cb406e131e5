// Relay Error Types
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("Invalid password.")]
    Unauthorized,

    #[error("{0}")]
    InvalidChunkSize(String),

    #[error("{0}")]
    MalformedField(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("{0}")]
    Downstream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingField(_) | RelayError::InvalidArguments(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::Unauthorized => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
