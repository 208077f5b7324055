//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The SPARQL endpoint failed or answered something unusable.
  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("internal error: {0}")]
  Internal(#[source] facetry_engine::Error),
}

impl From<facetry_engine::Error> for ApiError {
  fn from(e: facetry_engine::Error) -> Self {
    use facetry_engine::Error;
    match e {
      Error::UnknownFacet(id) => ApiError::NotFound(format!("facet {id} not found")),
      Error::SelectionMismatch { .. } | Error::InvalidTerm { .. } => {
        ApiError::BadRequest(e.to_string())
      }
      Error::Endpoint(_) | Error::MalformedRow(_) => ApiError::Upstream(e.to_string()),
      Error::Core(_) | Error::Query(_) => ApiError::Internal(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m.clone()),
      ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if status.is_server_error() {
      tracing::error!(%status, "{message}");
    }
    (status, Json(json!({ "error": message }))).into_response()
  }
}
