use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Request-level failures, converted to JSON error bodies at the handler
/// boundary. The bodies mirror the API contract: `{"msg": ..., "errors": {...}}`
/// with per-field detail only for validation failures.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{msg}")]
    Validation {
        msg: String,
        errors: BTreeMap<String, String>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    // Duplicate registration, fully-booked event. The observed API reports
    // these as 400 rather than 409.
    #[error("{0}")]
    Conflict(String),

    #[error("Server error")]
    Database(#[from] sqlx::Error),

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>, errors: BTreeMap<String, String>) -> Self {
        ApiError::Validation {
            msg: msg.into(),
            errors,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side detail stays in the logs, clients get a generic message.
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {:?}", e),
            ApiError::Internal(e) => tracing::error!("internal error: {:?}", e),
            _ => {}
        }

        let body = match &self {
            ApiError::Validation { msg, errors } => json!({ "msg": msg, "errors": errors }),
            _ => json!({ "msg": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: BTreeMap<String, String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let msg = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                (field.to_string(), msg)
            })
            .collect();
        ApiError::validation("Invalid request data", fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let err = ApiError::validation(
            "Missing required fields",
            BTreeMap::from([("name".to_string(), "Name is required".to_string())]),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_400() {
        assert_eq!(
            ApiError::conflict("Already registered for this event").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            ApiError::not_found("Event not found").status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn auth_errors_keep_distinct_statuses() {
        assert_eq!(
            ApiError::Unauthorized("Token expired".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("Insufficient permissions".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
