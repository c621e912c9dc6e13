use std::error::Error;

use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::models::value::ValueError;

// TODO: Can't use the Payload wrapper as is, as inside `into_response`, we
// don't have a type for `Data` in `Payload<Data>`. I'm sure there's a way to
// model this differently that would work, but this is expedient.
#[derive(Debug, Serialize)]
pub struct ErrorWrapper {
    error: ProblemDetails,
}

impl ErrorWrapper {
    pub fn new(error: ProblemDetails) -> Self {
        Self { error }
    }
}

#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    title: String,
    detail: Option<String>,
}

/// Application errors that can be automatically turned into an appropriate
/// HTTP response. Variants mirror the seven error kinds the query/write
/// path can produce.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed wire value or query descriptor.
    #[error("could not parse value: {0}")]
    Parse(#[from] ValueError),

    /// A statement already has a different, saved triple than the one
    /// being submitted for it.
    #[error("statement `{handle}` already has a different triple")]
    TripleConflict { handle: uuid::Uuid },

    /// The compiler rejected a query shape (e.g. an operator applied to a
    /// column it can't act on).
    #[error("invalid query: {0}")]
    QueryShape(String),

    /// No well-formed `Authorization` header was present.
    #[error("authentication required")]
    Unauthenticated,

    /// Requested handle/reference does not exist.
    #[error("not found")]
    NotFound,

    #[error("database error")]
    Sqlx(#[from] sqlx::Error),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::TripleConflict { .. } => StatusCode::CONFLICT,
            AppError::QueryShape(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Sqlx(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Sqlx(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                StatusCode::CONFLICT
            }
            AppError::Sqlx(sqlx::Error::Database(_)) => StatusCode::BAD_REQUEST,
            AppError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = ?status, message = ?self, details = ?self.source());
        }

        let mut response = (
            status,
            Json(ErrorWrapper::new(ProblemDetails {
                title: self.to_string(),
                detail: self.source().map(ToString::to_string),
            })),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                hyper::header::WWW_AUTHENTICATE,
                hyper::header::HeaderValue::from_static("Basic"),
            );
        }

        response
    }
}
