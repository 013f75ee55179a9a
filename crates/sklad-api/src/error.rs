//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use sklad_core::store::DomainFailure;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// A domain rule rejected the request.
  #[error(transparent)]
  Domain(sklad_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: domain failures keep their kind, everything
  /// else becomes an opaque store error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + DomainFailure + Send + Sync + 'static,
  {
    match err.domain() {
      Some(domain) => Self::Domain(domain.clone()),
      None => Self::Store(Box::new(err)),
    }
  }

  fn status(&self) -> StatusCode {
    use sklad_core::Error as E;
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Domain(e) => match e {
        E::NotFound { .. } | E::InvoiceNotFound(_) | E::ItemNotFound(_) => {
          StatusCode::NOT_FOUND
        }
        E::DuplicateKey { .. } | E::DuplicateMovement(_) | E::ItemInUse(_) => {
          StatusCode::CONFLICT
        }
        E::InvalidField { .. }
        | E::NoFieldsToUpdate
        | E::InvalidValue { .. }
        | E::InvalidDecimal(_)
        | E::Overflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        E::UnknownInvoiceType(_) | E::UnknownVatRate(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
