use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder, ResponseError};
use serde::Serialize;

use crate::datastore::DatastoreError;

/// Errors returned by the api handlers.
///
/// Internal errors keep their cause for the server log only, callers get a
/// generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    message: &'a str,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.as_str(),
            ApiError::Internal(cause) => {
                log::error!("{}", cause);
                "internal server error"
            }
        };
        HttpResponseBuilder::new(self.status_code()).json(ErrorResponse {
            error: self.code(),
            message,
        })
    }
}

impl From<DatastoreError> for ApiError {
    fn from(err: DatastoreError) -> Self {
        match err {
            DatastoreError::NoSuchEntity => ApiError::NotFound("not found".to_string()),
            DatastoreError::InvalidKey(key) => {
                ApiError::BadRequest(format!("invalid id {:?}", key))
            }
            e => ApiError::Internal(e.to_string()),
        }
    }
}
