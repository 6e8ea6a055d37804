use crate::error::LedgerError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidAmount(_)
        | LedgerError::InvalidUsername(_)
        | LedgerError::AccountNotFound(_) => StatusCode::BAD_REQUEST,
        LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::Conflict { .. } => StatusCode::CONFLICT,
        LedgerError::Overflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Corrupt { .. }
        | LedgerError::Config(_)
        | LedgerError::CsvError(_)
        | LedgerError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        }
        json_error(status, self.code(), self.to_string())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Malformed or mistyped request bodies are client errors with a stable code.
pub fn rejection_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}
