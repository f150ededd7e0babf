//! API error type with IntoResponse.
//!
//! Each variant maps to one row of the response contract; bodies are
//! `{ok:false, error, detail?}` through the shared JSON boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::http::respond;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Statement failed the SELECT prefix guard (400)
    #[error("Only SELECT queries are allowed.")]
    SelectRejected,

    /// Query-parameter route called without a statement (400)
    #[error("Missing query param. Use /lab5/api/v1/sql?query=SELECT...")]
    MissingQuery,

    /// Path-route remainder did not percent-decode (400)
    #[error("Bad URL encoding")]
    BadEncoding,

    /// Request body could not be read (400)
    #[error("Bad request body")]
    BadBody,

    /// Writer-side failure during the fixed insert (500, logged)
    #[error("Insert failed")]
    InsertFailed(#[source] DbError),

    /// Reader-side failure executing a validated SELECT (400, logged)
    #[error("Query failed")]
    QueryFailed(#[source] DbError),

    /// Unmatched method/path (404)
    #[error("Not found")]
    NotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::SelectRejected
            | Self::MissingQuery
            | Self::BadEncoding
            | Self::BadBody
            | Self::QueryFailed(_) => StatusCode::BAD_REQUEST,
            Self::InsertFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::InsertFailed(err) => {
                tracing::error!(error = %err, "insert failed");
                Some(err.to_string())
            }
            Self::QueryFailed(err) => {
                tracing::error!(error = %err, "select failed");
                Some(err.to_string())
            }
            _ => None,
        };

        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
            detail,
        };
        respond::json(self.status(), &body)
    }
}
