//! CORS headers and preflight handling.
//!
//! The contract wants all three headers on every response (success,
//! error, and 404 alike) and a bodyless 204 for OPTIONS preflights on
//! any path, so this is a plain middleware rather than
//! `tower_http::cors::CorsLayer` (which answers preflights with 200 and
//! scopes the method/header lists to preflight responses).

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::server::AppState;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, ngrok-skip-browser-warning";

pub fn apply_cors_headers(headers: &mut HeaderMap, origin: &HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Middleware wrapping the whole router, fallback included. OPTIONS
/// short-circuits before routing, so unknown paths preflight too.
pub async fn layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), &state.cors_origin);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &state.cors_origin);
    response
}
