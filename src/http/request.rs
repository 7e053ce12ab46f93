//! Request inspection.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Read the request ID back for log correlation
//! - Extract the optional `ID` query parameter
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Query parsing never rejects a request: malformed pairs are skipped and
//!   only the first `ID` counts

use axum::http::{HeaderMap, HeaderValue, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Name of the lookup query parameter.
pub const ID_PARAM: &str = "ID";

/// Issues a fresh UUID v4 for requests that arrive without an ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Access to the request ID header.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<String>;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> Option<String> {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// First `ID` query value; an empty value counts as absent.
pub fn person_id_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
