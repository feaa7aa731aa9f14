// shop_server/src/errors.rs

use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use cartflow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// Cart references a product that does not exist. Reported as 400 so the
  /// client refreshes its cart.
  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Insufficient Stock: {0}")]
  InsufficientStock(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Storage Error: {0}")]
  Storage(#[from] StoreError),

  #[error("Checkout exceeded its deadline of {0} ms")]
  DeadlineExceeded(u64),

  #[error("Cartflow Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<StoreError>() {
      Ok(store_err) => AppError::Storage(store_err),
      Err(other) => AppError::Internal(format!("{:#}", other)),
    }
  }
}

impl AppError {
  /// Message placed in the `{"error": ...}` envelope. Server-side failures
  /// stay opaque; their detail only goes to the log.
  pub fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) | AppError::InsufficientStock(m) => m.clone(),
      AppError::Storage(_) | AppError::DeadlineExceeded(_) => "internal storage error".to_string(),
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => "internal server error".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::NotFound(_) | AppError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Config(_)
      | AppError::Storage(_)
      | AppError::DeadlineExceeded(_)
      | AppError::Workflow { .. }
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
