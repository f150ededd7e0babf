//! The single JSON-encoding boundary.
//!
//! Every response body, success or error, goes through `json`:
//! pretty-printed, `application/json; charset=utf-8`. CORS headers are
//! added by the middleware on the way out.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

pub fn json<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    match serde_json::to_vec_pretty(payload) {
        Ok(body) => (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(CONTENT_TYPE_JSON),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "response serialization failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
