use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::error::ApiError;
use crate::middleware::AdminAuth;
use crate::models::registration::{is_valid_mobile, Registration};
use crate::services::export;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/registrations",
            get(list_registrations).post(create_registration),
        )
        .route(
            "/registrations/download/{event_id}",
            get(download_registrations),
        )
}

/* ---------- create ---------- */

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: Option<String>,
    pub section: Option<String>,
    pub reg_no: Option<String>,
    #[validate(custom(function = validate_mobile))]
    pub mobile: Option<String>,
    pub event_id: Option<i64>,
}

fn validate_mobile(mobile: &str) -> Result<(), ValidationError> {
    if is_valid_mobile(mobile) {
        Ok(())
    } else {
        Err(ValidationError::new("mobile").with_message("Mobile number must be 10 digits".into()))
    }
}

pub(crate) fn check_required(req: &CreateRegistrationRequest) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();
    let missing = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
    if missing(&req.name) {
        errors.insert("name".to_string(), "Name is required".to_string());
    }
    if missing(&req.section) {
        errors.insert("section".to_string(), "Section is required".to_string());
    }
    if missing(&req.reg_no) {
        errors.insert(
            "regNo".to_string(),
            "Registration number is required".to_string(),
        );
    }
    if missing(&req.mobile) {
        errors.insert("mobile".to_string(), "Mobile number is required".to_string());
    }
    if req.event_id.is_none() {
        errors.insert("eventId".to_string(), "Event ID is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Missing required fields", errors))
    }
}

// The unique constraint created by this repo's migrations, and the
// single-field one a prior schema generation may have left behind.
pub const COMPOUND_CONSTRAINT: &str = "registrations_reg_no_event_id_key";
pub const LEGACY_CONSTRAINT: &str = "registrations_reg_no_key";

/// The database rejection on the unique index is the authoritative duplicate
/// guard; the pre-check in the handler is an optimization only.
pub(crate) fn duplicate_error(constraint: Option<&str>) -> ApiError {
    match constraint {
        Some(LEGACY_CONSTRAINT) => ApiError::conflict(
            "Registration number already exists (global unique). \
             Please ask admin to fix DB indexes to allow same regNo across events.",
        ),
        _ => ApiError::conflict("Already registered for this event"),
    }
}

fn map_insert_error(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return duplicate_error(db.constraint());
        }
    }
    ApiError::Database(e)
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub title: String,
    pub date: DateTime<Utc>,
    pub time: Option<String>,
    pub location: String,
}

#[derive(Debug, FromRow)]
struct EventCapacityRow {
    title: String,
    date: DateTime<Utc>,
    time: Option<String>,
    location: String,
    seats: i32,
    attendees: i32,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub registration: Registration,
    pub event: EventSummary,
}

async fn create_registration(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_required(&req)?;
    req.validate()?;

    let name = req.name.unwrap_or_default().trim().to_string();
    let section = req.section.unwrap_or_default().trim().to_uppercase();
    let reg_no = req.reg_no.unwrap_or_default().trim().to_uppercase();
    let mobile = req.mobile.unwrap_or_default().trim().to_string();
    let event_id = req.event_id.unwrap_or_default();

    let (summary, seats, attendees) = sqlx::query_as::<_, EventCapacityRow>(
        "SELECT title, date, time, location, seats, attendees FROM events WHERE id = $1",
    )
    .bind(event_id)
    .fetch_optional(&state.db.pool)
    .await?
    .map(|row| {
        (
            EventSummary {
                title: row.title,
                date: row.date,
                time: row.time,
                location: row.location,
            },
            row.seats,
            row.attendees,
        )
    })
    .ok_or_else(|| ApiError::not_found("Event not found"))?;

    if seats > 0 && attendees >= seats {
        return Err(ApiError::conflict("Event is fully booked"));
    }

    // Duplicate pre-check; the unique index inside the transaction below is
    // the real guard.
    let already = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM registrations WHERE reg_no = $1 AND event_id = $2)",
    )
    .bind(&reg_no)
    .bind(event_id)
    .fetch_one(&state.db.pool)
    .await?;
    if already {
        return Err(ApiError::conflict("Already registered for this event"));
    }

    // Seat claim and insert happen in one transaction. The conditional
    // increment claims a seat atomically, so two concurrent registrations
    // near the seat boundary cannot overbook; a unique violation on the
    // insert rolls the claim back.
    let mut tx = state.db.pool.begin().await?;

    let claimed = sqlx::query(
        "UPDATE events SET attendees = attendees + 1
         WHERE id = $1 AND (seats = 0 OR attendees < seats)",
    )
    .bind(event_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        tx.rollback().await?;
        return Err(ApiError::conflict("Event is fully booked"));
    }

    let registration = sqlx::query_as::<_, Registration>(
        "INSERT INTO registrations (name, section, reg_no, mobile, event_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, name, section, reg_no, mobile, event_id, status, created_at",
    )
    .bind(&name)
    .bind(&section)
    .bind(&reg_no)
    .bind(&mobile)
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_insert_error)?;

    tx.commit().await?;

    tracing::info!(
        "registration {} created: {} for event {}",
        registration.id,
        registration.reg_no,
        event_id
    );

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            registration,
            event: summary,
        }),
    ))
}

/* ---------- list ---------- */

#[derive(Debug, FromRow)]
struct RegistrationListRow {
    id: i64,
    name: String,
    section: String,
    reg_no: String,
    mobile: String,
    event_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    event_title: Option<String>,
    event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationListItem {
    id: i64,
    name: String,
    section: String,
    reg_no: String,
    mobile: String,
    event_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    // Null fields when the event was deleted; orphans stay readable.
    event: Option<RegistrationListEvent>,
}

#[derive(Debug, Serialize)]
struct RegistrationListEvent {
    title: String,
    date: DateTime<Utc>,
}

async fn list_registrations(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let rows = sqlx::query_as::<_, RegistrationListRow>(
        r#"
        SELECT r.id, r.name, r.section, r.reg_no, r.mobile, r.event_id, r.status, r.created_at,
               e.title AS event_title, e.date AS event_date
        FROM registrations r
        LEFT JOIN events e ON e.id = r.event_id
        ORDER BY r.created_at DESC
        "#,
    )
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<RegistrationListItem> = rows
        .into_iter()
        .map(|r| RegistrationListItem {
            id: r.id,
            name: r.name,
            section: r.section,
            reg_no: r.reg_no,
            mobile: r.mobile,
            event_id: r.event_id,
            status: r.status,
            created_at: r.created_at,
            event: match (r.event_title, r.event_date) {
                (Some(title), Some(date)) => Some(RegistrationListEvent { title, date }),
                _ => None,
            },
        })
        .collect();

    Ok(Json(payload))
}

/* ---------- export ---------- */

async fn download_registrations(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(event_id): Path<i64>,
) -> Result<Response, ApiError> {
    let title = sqlx::query_scalar::<_, String>("SELECT title FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    let registrations = sqlx::query_as::<_, Registration>(
        "SELECT id, name, section, reg_no, mobile, event_id, status, created_at
         FROM registrations WHERE event_id = $1 ORDER BY created_at",
    )
    .bind(event_id)
    .fetch_all(&state.db.pool)
    .await?;

    let buffer = export::registrations_workbook(&registrations)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("xlsx generation failed: {e}")))?;

    let filename = format!("registrations-{}.xlsx", export::sanitize_filename(&title));

    Response::builder()
        .header(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", filename),
        )
        .body(Body::from(buffer))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("response build failed: {e}")))
}
