use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::AdminAuth;
use crate::models::event::{self, Event};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/seed/all", post(seed_events))
}

/* ---------- list / get ---------- */

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithStatus {
    #[serde(flatten)]
    pub event: Event,
    pub computed_status: &'static str,
}

const EVENT_COLUMNS: &str = "id, title, description, date, time, location, category, status, \
                             image, organizer, seats, attendees, created_at, updated_at";

/// Whitelisted ORDER BY clause; anything unrecognized falls back to the
/// default newest-first ordering.
pub(crate) fn order_clause(sort: Option<&str>) -> &'static str {
    match sort {
        Some("date") => " ORDER BY date ASC",
        Some("title") => " ORDER BY title ASC",
        Some("-title") => " ORDER BY title DESC",
        _ => " ORDER BY date DESC",
    }
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut q = format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE");
    let mut bind_idx = 1;

    let category = params.category.filter(|c| !c.is_empty() && c != "all");
    if category.is_some() {
        q.push_str(&format!(" AND category = ${}", bind_idx));
        bind_idx += 1;
    }

    match params.status.as_deref() {
        Some("upcoming") => q.push_str(" AND date >= NOW()"),
        Some("completed") => q.push_str(" AND date < NOW()"),
        _ => {}
    }

    let search = params.search.filter(|s| !s.trim().is_empty());
    if search.is_some() {
        q.push_str(&format!(
            " AND (title ILIKE ${0} OR description ILIKE ${0})",
            bind_idx
        ));
    }

    q.push_str(order_clause(params.sort.as_deref()));

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(c) = category {
        dbq = dbq.bind(c);
    }
    if let Some(s) = search {
        dbq = dbq.bind(format!("%{}%", s.trim()));
    }

    let events = dbq.fetch_all(&state.db.pool).await?;

    let now = Utc::now();
    let payload: Vec<EventWithStatus> = events
        .into_iter()
        .map(|e| EventWithStatus {
            computed_status: e.computed_status(now),
            event: e,
        })
        .collect();

    Ok(Json(payload))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let event = fetch_event(&state, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))?;
    Ok(Json(event))
}

pub(crate) async fn fetch_event(state: &AppState, id: i64) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
}

/* ---------- create ---------- */

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub seats: Option<i32>,
}

// Schema-level field checks shared by create, update and seed. A `None`
// field means "not supplied" and is skipped.
fn schema_errors(
    title: Option<&str>,
    category: Option<&str>,
    time: Option<&str>,
    image: Option<&str>,
    seats: Option<i32>,
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    if title.is_some_and(|t| t.trim().len() < 3) {
        errors.insert(
            "title".to_string(),
            "Title must be at least 3 characters long".to_string(),
        );
    }
    if let Some(category) = category {
        if !event::is_valid_category(category) {
            errors.insert(
                "category".to_string(),
                format!("{} is not a supported category", category),
            );
        }
    }
    if let Some(time) = time.filter(|t| !t.is_empty()) {
        if !event::is_valid_time(time) {
            errors.insert(
                "time".to_string(),
                "Time must be in HH:MM format".to_string(),
            );
        }
    }
    if let Some(image) = image.filter(|i| !i.is_empty()) {
        if !event::is_valid_image(image) {
            errors.insert("image".to_string(), "Invalid image format".to_string());
        }
    }
    if seats.is_some_and(|s| s < 0) {
        errors.insert("seats".to_string(), "Seats cannot be negative".to_string());
    }
    errors
}

pub(crate) fn validate_create(req: &CreateEventRequest, now: DateTime<Utc>) -> Result<(), ApiError> {
    let mut errors = BTreeMap::new();
    if req.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        errors.insert("title".to_string(), "Title is required".to_string());
    }
    if req.date.is_none() {
        errors.insert("date".to_string(), "Date is required".to_string());
    }
    if req
        .category
        .as_deref()
        .map_or(true, |c| c.trim().is_empty())
    {
        errors.insert("category".to_string(), "Category is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::validation("Missing required fields", errors));
    }

    let errors = schema_errors(
        req.title.as_deref(),
        req.category.as_deref(),
        req.time.as_deref(),
        req.image.as_deref(),
        req.seats,
    );
    if !errors.is_empty() {
        return Err(ApiError::validation("Invalid event data", errors));
    }

    if req.date.is_some_and(|d| d < now) {
        return Err(ApiError::validation(
            "Event date must be in the future",
            BTreeMap::new(),
        ));
    }

    Ok(())
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_create(&req, Utc::now())?;

    let event = sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events (title, description, date, time, location, category, image, organizer, seats)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(req.title.unwrap_or_default().trim().to_string())
    .bind(req.description.unwrap_or_default())
    .bind(req.date.unwrap_or_else(Utc::now))
    .bind(req.time.filter(|t| !t.is_empty()))
    .bind(req.location.unwrap_or_default())
    .bind(req.category.unwrap_or_default())
    .bind(req.image.filter(|i| !i.is_empty()))
    .bind(admin.email)
    .bind(req.seats.unwrap_or(0))
    .fetch_one(&state.db.pool)
    .await?;

    tracing::info!("event {} created: {}", event.id, event.title);
    Ok((StatusCode::CREATED, Json(event)))
}

/* ---------- update ---------- */

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub image: Option<String>,
    pub seats: Option<i32>,
}

pub(crate) fn validate_update(req: &UpdateEventRequest) -> Result<(), ApiError> {
    let mut errors = schema_errors(
        req.title.as_deref(),
        req.category.as_deref(),
        req.time.as_deref(),
        req.image.as_deref(),
        req.seats,
    );
    if let Some(status) = req.status.as_deref() {
        if !matches!(status, "upcoming" | "completed") {
            errors.insert(
                "status".to_string(),
                "Status must be upcoming or completed".to_string(),
            );
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::validation("Invalid event data", errors));
    }
    Ok(())
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_update(&req)?;

    // Partial replacement: only the provided fields are written. An empty
    // image string means "keep the current one".
    fn push(field: &str, sets: &mut Vec<String>, idx: &mut u32) {
        sets.push(format!("{} = ${}", field, idx));
        *idx += 1;
    }

    let mut sets: Vec<String> = Vec::new();
    let mut bind_idx: u32 = 1;

    if req.title.is_some() {
        push("title", &mut sets, &mut bind_idx);
    }
    if req.description.is_some() {
        push("description", &mut sets, &mut bind_idx);
    }
    if req.date.is_some() {
        push("date", &mut sets, &mut bind_idx);
    }
    if req.time.is_some() {
        push("time", &mut sets, &mut bind_idx);
    }
    if req.location.is_some() {
        push("location", &mut sets, &mut bind_idx);
    }
    if req.category.is_some() {
        push("category", &mut sets, &mut bind_idx);
    }
    if req.status.is_some() {
        push("status", &mut sets, &mut bind_idx);
    }
    if req.image.as_deref().is_some_and(|i| !i.is_empty()) {
        push("image", &mut sets, &mut bind_idx);
    }
    if req.seats.is_some() {
        push("seats", &mut sets, &mut bind_idx);
    }
    sets.push("updated_at = NOW()".to_string());

    let q = format!(
        "UPDATE events SET {} WHERE id = ${} RETURNING {EVENT_COLUMNS}",
        sets.join(", "),
        bind_idx
    );

    let mut dbq = sqlx::query_as::<_, Event>(&q);
    if let Some(v) = req.title {
        dbq = dbq.bind(v.trim().to_string());
    }
    if let Some(v) = req.description {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.date {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.time {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.location {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.category {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.status {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.image.filter(|i| !i.is_empty()) {
        dbq = dbq.bind(v);
    }
    if let Some(v) = req.seats {
        dbq = dbq.bind(v);
    }

    let event = dbq
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    Ok(Json(event))
}

/* ---------- delete ---------- */

async fn delete_event(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    // No cascade: registrations referencing this event stay readable.
    let deleted = sqlx::query_scalar::<_, i64>("DELETE FROM events WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?;

    match deleted {
        Some(_) => Ok(Json(json!({ "msg": "Deleted" }))),
        None => Err(ApiError::not_found("Not found")),
    }
}

/* ---------- seed ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    pub time: Option<String>,
    #[serde(default)]
    pub location: String,
    pub category: String,
    pub image: Option<String>,
    #[serde(default)]
    pub seats: i32,
}

#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    #[serde(default)]
    pub events: Vec<SeedEvent>,
}

// Seeded events go through the same schema-level checks as single creates,
// so a bulk load cannot insert rows the create endpoint would reject.
pub(crate) fn validate_seed(ev: &SeedEvent) -> Result<(), ApiError> {
    let errors = schema_errors(
        Some(&ev.title),
        Some(&ev.category),
        ev.time.as_deref(),
        ev.image.as_deref(),
        Some(ev.seats),
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation("Invalid event data", errors))
    }
}

async fn seed_events(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<SeedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for ev in &req.events {
        validate_seed(ev)?;
    }

    let mut tx = state.db.pool.begin().await?;
    for ev in &req.events {
        sqlx::query(
            "INSERT INTO events (title, description, date, time, location, category, image, organizer, seats)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&ev.title)
        .bind(&ev.description)
        .bind(ev.date)
        .bind(&ev.time)
        .bind(&ev.location)
        .bind(&ev.category)
        .bind(&ev.image)
        .bind(&admin.email)
        .bind(ev.seats)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(Json(json!({ "createdCount": req.events.len() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_create() -> CreateEventRequest {
        CreateEventRequest {
            title: Some("Tech Fest".to_string()),
            date: Some(Utc::now() + Duration::days(7)),
            category: Some("technology".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn create_accepts_minimal_valid_payload() {
        assert!(validate_create(&valid_create(), Utc::now()).is_ok());
    }

    #[test]
    fn create_reports_all_missing_fields_at_once() {
        let err = validate_create(&CreateEventRequest::default(), Utc::now()).unwrap_err();
        match err {
            ApiError::Validation { msg, errors } => {
                assert_eq!(msg, "Missing required fields");
                assert!(errors.contains_key("title"));
                assert!(errors.contains_key("date"));
                assert!(errors.contains_key("category"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn create_rejects_past_dates() {
        let mut req = valid_create();
        req.date = Some(Utc::now() - Duration::days(1));
        let err = validate_create(&req, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { msg, .. } if msg == "Event date must be in the future"
        ));
    }

    #[test]
    fn create_rejects_short_title_and_bad_category() {
        let mut req = valid_create();
        req.title = Some("ab".to_string());
        req.category = Some("music".to_string());
        let err = validate_create(&req, Utc::now()).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert!(errors.contains_key("title"));
                assert!(errors.contains_key("category"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn create_rejects_bad_time_and_image() {
        let mut req = valid_create();
        req.time = Some("25:00".to_string());
        req.image = Some("banner.png".to_string());
        let err = validate_create(&req, Utc::now()).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert!(errors.contains_key("time"));
                assert!(errors.contains_key("image"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn update_allows_empty_payload() {
        assert!(validate_update(&UpdateEventRequest::default()).is_ok());
    }

    #[test]
    fn update_rejects_bad_status() {
        let req = UpdateEventRequest {
            status: Some("finished".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&req).is_err());
    }

    fn valid_seed() -> SeedEvent {
        SeedEvent {
            title: "Robotics Workshop".to_string(),
            description: String::new(),
            date: Utc::now() + Duration::days(3),
            time: None,
            location: String::new(),
            category: "workshop".to_string(),
            image: None,
            seats: 40,
        }
    }

    #[test]
    fn seed_accepts_valid_event() {
        assert!(validate_seed(&valid_seed()).is_ok());
    }

    #[test]
    fn seed_applies_same_field_checks_as_create() {
        let mut ev = valid_seed();
        ev.title = "ab".to_string();
        ev.category = "music".to_string();
        ev.time = Some("25:00".to_string());
        ev.seats = -1;
        let err = validate_seed(&ev).unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                for field in ["title", "category", "time", "seats"] {
                    assert!(errors.contains_key(field), "missing error for {field}");
                }
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn sort_clause_is_whitelisted() {
        assert_eq!(order_clause(Some("date")), " ORDER BY date ASC");
        assert_eq!(order_clause(Some("-date")), " ORDER BY date DESC");
        assert_eq!(order_clause(None), " ORDER BY date DESC");
        assert_eq!(
            order_clause(Some("; DROP TABLE events")),
            " ORDER BY date DESC"
        );
    }
}
