//! Response construction and error mapping.
//!
//! # Responsibilities
//! - Serialize records to JSON bodies
//! - Map handler errors to HTTP status codes and outcomes
//!
//! # Design Decisions
//! - Bodies are serialized before the response is built, so a
//!   serialization failure can still become a 500
//! - Server errors share one fixed user-facing message

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::observability::Outcome;

/// Body of every 500 response.
pub const PROCESSING_ERROR: &str = "Unable to process request";

/// Errors the persons handler can end with.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("couldnt convert to json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("error on purpose")]
    InjectedFault,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::Serialization(_) | ServiceError::InjectedFault => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_status(self.status())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::MethodNotAllowed => self.status().into_response(),
            _ => (self.status(), PROCESSING_ERROR).into_response(),
        }
    }
}

/// A 200 response with `value` as its JSON body.
pub fn json_response<T: Serialize + ?Sized>(value: &T) -> Result<Response, ServiceError> {
    let body = serde_json::to_vec(value)?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}
