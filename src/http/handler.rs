//! The instrumented persons handler.
//!
//! # States
//! ```text
//! Entry:       method != GET → 405 (ClientError)
//! Dispatch:    ID present    → LookupById → 200 record | 200 null | 500
//!              ID absent     → ListAll    → 200 array  | 500 (injected fault)
//! Exit:        artificial delay, then end(outcome)
//! ```
//!
//! Every path goes through [`InstrumentationContext::end`]; if the future is
//! dropped first, the context's `Drop` closes the span instead.

use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use tracing::Level;

use crate::http::request::{person_id_param, RequestIdExt};
use crate::http::response::{json_response, ServiceError};
use crate::http::server::AppState;
use crate::observability::tracing::ERROR_FIELD;
use crate::observability::{Correlation, InstrumentationContext, Outcome};

pub const LIST_SPAN: &str = "write_response_persons";
pub const LOOKUP_SPAN: &str = "write_response_by_person_id";

/// `/significant_persons`
pub async fn persons_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let id = person_id_param(&uri);
    let parent = state.telemetry.traces.extract_parent(&headers);
    let ctx = InstrumentationContext::begin(
        &state.telemetry,
        Correlation {
            method: method.to_string(),
            id: id.clone(),
            request_id: headers.request_id(),
        },
        parent,
    );

    if method != Method::GET {
        ctx.log(
            Level::DEBUG,
            "process handler called",
            &[("method_not_allowed", method.to_string())],
        );
        return conclude(ctx, Err(ServiceError::MethodNotAllowed));
    }

    let result = match id.as_deref() {
        Some(id) => write_response_by_person_id(&state, &ctx, id).await,
        None => write_response_persons(&state, &ctx).await,
    };
    conclude(ctx, result)
}

/// Turn the handler result into a response and close the context.
fn conclude(mut ctx: InstrumentationContext, result: Result<Response, ServiceError>) -> Response {
    match result {
        Ok(response) => {
            let status = response.status();
            ctx.end(Outcome::from_status(status), status);
            response
        }
        Err(err) => {
            let (outcome, status) = (err.outcome(), err.status());
            ctx.record_error(err.to_string());
            ctx.end(outcome, status);
            err.into_response()
        }
    }
}

async fn write_response_persons(
    state: &AppState,
    ctx: &InstrumentationContext,
) -> Result<Response, ServiceError> {
    let span = ctx.child(LIST_SPAN);
    ctx.log(Level::DEBUG, "response all persons", &[("all_persons", "true".into())]);

    let persons = state.store.list_all();

    if state.simulation.should_fail() {
        let err = ServiceError::InjectedFault;
        ctx.log(Level::WARN, "injected fault", &[("error", err.to_string())]);
        if let Some(span) = &span {
            span.annotate(ERROR_FIELD, &err.to_string());
        }
        return Err(err);
    }

    if let Some(span) = &span {
        span.annotate("status", "StatusOK");
    }

    let result = json_response(persons).inspect_err(|e| {
        ctx.log(
            Level::ERROR,
            "write_response_persons couldnt convert to json",
            &[("error", e.to_string())],
        );
        if let Some(span) = &span {
            span.annotate(ERROR_FIELD, &e.to_string());
        }
    });
    state.simulation.pause().await;
    result
}

async fn write_response_by_person_id(
    state: &AppState,
    ctx: &InstrumentationContext,
    id: &str,
) -> Result<Response, ServiceError> {
    let span = ctx.child(LOOKUP_SPAN);
    ctx.log(Level::DEBUG, "response by person id", &[]);

    let person = state.store.get_by_id(id);

    if let Some(span) = &span {
        span.annotate("status", "StatusOK");
        span.annotate("arg0", id);
    }

    let result = json_response(&person).inspect_err(|e| {
        ctx.log(
            Level::ERROR,
            "write_response_by_person_id couldnt convert to json",
            &[("error", e.to_string())],
        );
        if let Some(span) = &span {
            span.annotate(ERROR_FIELD, &e.to_string());
        }
    });
    state.simulation.pause().await;
    result
}
