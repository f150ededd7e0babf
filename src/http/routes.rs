//! The three handlers and the 404 fallback.
//!
//! Both select routes share one flow: normalize the statement, run the
//! prefix guard, then hand the string to the gateway verbatim. The
//! guard runs before any gateway call, so rejected statements never
//! open a connection.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::RowObject;
use crate::http::error::ApiError;
use crate::http::respond;
use crate::http::server::AppState;
use crate::models::{looks_like_select_only, strip_quote_pair};

#[derive(Serialize)]
struct InsertOk {
    ok: bool,
    message: &'static str,
    #[serde(rename = "insertedRows")]
    inserted_rows: u64,
}

#[derive(Serialize)]
struct SelectOk {
    ok: bool,
    rows: Vec<RowObject>,
}

#[derive(Deserialize)]
struct SelectParams {
    #[serde(default)]
    query: Option<String>,
}

/// POST /lab5/api/v1/insert - append the fixed patient rows.
///
/// The body is drained but its content ignored; a read failure still
/// maps to 400 before any database work.
async fn insert(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    body.map_err(|_| ApiError::BadBody)?;

    let inserted = state
        .db
        .insert_fixed_rows()
        .await
        .map_err(ApiError::InsertFailed)?;

    Ok(respond::json(
        StatusCode::OK,
        &InsertOk {
            ok: true,
            message: "Inserted fixed rows",
            inserted_rows: inserted,
        },
    ))
}

/// GET /lab5/api/v1/sql?query=SELECT...
async fn select_from_query(
    State(state): State<AppState>,
    params: Result<Query<SelectParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::MissingQuery)?;
    let sql = params.query.as_deref().map(str::trim).unwrap_or_default();
    if sql.is_empty() {
        return Err(ApiError::MissingQuery);
    }

    run_guarded_select(&state, sql).await
}

/// GET /lab5/api/v1/sql/{*stmt} - legacy path form.
///
/// Axum percent-decodes the wildcard; a remainder that does not decode
/// surfaces as a rejection and maps to 400. One layer of surrounding
/// quotes is tolerated so `/sql/%22select%20...%22` works as shipped in
/// the lab client.
async fn select_from_path(
    State(state): State<AppState>,
    stmt: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(raw) = stmt.map_err(|_| ApiError::BadEncoding)?;
    let sql = strip_quote_pair(&raw);

    run_guarded_select(&state, sql).await
}

/// GET /lab5/api/v1/sql/ - empty path remainder. The wildcard route
/// needs at least one character, so the bare trailing slash gets its
/// own route; an empty statement fails the guard like any other
/// non-SELECT.
async fn select_from_empty_path() -> ApiError {
    ApiError::SelectRejected
}

async fn run_guarded_select(state: &AppState, sql: &str) -> Result<Response, ApiError> {
    if !looks_like_select_only(sql) {
        return Err(ApiError::SelectRejected);
    }

    let rows = state
        .db
        .run_select(sql)
        .await
        .map_err(ApiError::QueryFailed)?;

    Ok(respond::json(StatusCode::OK, &SelectOk { ok: true, rows }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lab5/api/v1/insert", post(insert))
        .route("/lab5/api/v1/sql", get(select_from_query))
        .route("/lab5/api/v1/sql/", get(select_from_empty_path))
        .route("/lab5/api/v1/sql/{*stmt}", get(select_from_path))
        .fallback(not_found)
        .with_state(state)
}
