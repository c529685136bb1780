use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::{self, AdminAuth};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/test", get(test))
        .route("/admin/fix-registration-index", post(fix_registration_index))
}

async fn test() -> impl IntoResponse {
    Json(json!({ "msg": "Admin route is working" }))
}

/* ---------- login ---------- */

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// Absent and blank both count as "not provided".
pub(crate) fn credentials(req: LoginRequest) -> Result<(String, String), ApiError> {
    let email = req.email.filter(|e| !e.trim().is_empty());
    let password = req.password.filter(|p| !p.trim().is_empty());
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(ApiError::validation(
            "Please provide email and password",
            BTreeMap::new(),
        )),
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = credentials(req)?;

    if email != state.config.admin.email || password != state.config.admin.password {
        tracing::warn!("failed admin login attempt for {}", email);
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = middleware::create_token(
        &email,
        &state.config.jwt.secret,
        state.config.jwt.expires_in_hours,
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("token generation failed: {e}")))?;

    tracing::info!("admin {} logged in", email);
    Ok(Json(json!({ "token": token })))
}

/* ---------- index repair ---------- */

use crate::controllers::registrations::{COMPOUND_CONSTRAINT, LEGACY_CONSTRAINT};

async fn registration_indexes(state: &AppState) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT indexname FROM pg_indexes
         WHERE schemaname = current_schema() AND tablename = 'registrations'
         ORDER BY indexname",
    )
    .fetch_all(&state.db.pool)
    .await
}

// One-time data-repair utility for databases created by a prior schema
// generation that had a global unique index on reg_no.
async fn fix_registration_index(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let indexes = registration_indexes(&state).await?;
    let mut actions: Vec<String> = Vec::new();

    if indexes.iter().any(|ix| ix == LEGACY_CONSTRAINT) {
        // The legacy index may back a constraint or stand alone; drop both ways.
        sqlx::query(&format!(
            "ALTER TABLE registrations DROP CONSTRAINT IF EXISTS {LEGACY_CONSTRAINT}"
        ))
        .execute(&state.db.pool)
        .await?;
        sqlx::query(&format!("DROP INDEX IF EXISTS {LEGACY_CONSTRAINT}"))
            .execute(&state.db.pool)
            .await?;
        actions.push(format!("Dropped index {LEGACY_CONSTRAINT}"));
    }

    if indexes.iter().any(|ix| ix == COMPOUND_CONSTRAINT) {
        actions.push("Compound index already present".to_string());
    } else {
        sqlx::query(&format!(
            "CREATE UNIQUE INDEX {COMPOUND_CONSTRAINT} ON registrations (reg_no, event_id)"
        ))
        .execute(&state.db.pool)
        .await?;
        actions.push(format!(
            "Created compound unique index {COMPOUND_CONSTRAINT}"
        ));
    }

    let indexes = registration_indexes(&state).await?;
    Ok(Json(json!({ "ok": true, "actions": actions, "indexes": indexes })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn provided_credentials_pass_through() {
        let (email, password) = credentials(request("admin@campus.edu", "hunter2")).unwrap();
        assert_eq!(email, "admin@campus.edu");
        assert_eq!(password, "hunter2");
    }

    #[test]
    fn absent_fields_are_rejected() {
        let err = credentials(LoginRequest::default()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { msg, .. } if msg == "Please provide email and password"
        ));
    }

    #[test]
    fn blank_strings_count_as_missing() {
        for req in [request("", "hunter2"), request("admin@campus.edu", "   ")] {
            let err = credentials(req).unwrap_err();
            assert!(matches!(
                err,
                ApiError::Validation { msg, .. } if msg == "Please provide email and password"
            ));
        }
    }
}
