use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AdminAuth;
use crate::models::Contact;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contact", get(list_messages).post(submit_message))
        .route(
            "/contact/{id}",
            axum::routing::put(mark_read).delete(delete_message),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

async fn submit_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
    if missing(&req.name) || missing(&req.email) || missing(&req.subject) || missing(&req.message) {
        return Err(ApiError::validation(
            "All fields are required",
            BTreeMap::new(),
        ));
    }

    sqlx::query("INSERT INTO contacts (name, email, subject, message) VALUES ($1, $2, $3, $4)")
        .bind(req.name.unwrap_or_default().trim().to_string())
        .bind(req.email.unwrap_or_default().trim().to_string())
        .bind(req.subject.unwrap_or_default().trim().to_string())
        .bind(req.message.unwrap_or_default())
        .execute(&state.db.pool)
        .await?;

    Ok(Json(json!({ "msg": "Message sent successfully" })))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let messages = sqlx::query_as::<_, Contact>(
        "SELECT id, name, email, subject, message, is_read, created_at
         FROM contacts ORDER BY created_at DESC",
    )
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(messages))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let message = sqlx::query_as::<_, Contact>(
        "UPDATE contacts SET is_read = TRUE WHERE id = $1
         RETURNING id, name, email, subject, message, is_read, created_at",
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Message not found"))?;

    Ok(Json(message))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = sqlx::query_scalar::<_, i64>("DELETE FROM contacts WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?;

    match deleted {
        Some(_) => Ok(Json(json!({ "msg": "Message deleted" }))),
        None => Err(ApiError::not_found("Message not found")),
    }
}
