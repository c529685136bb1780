pub mod admin;
pub mod contact;
pub mod events;
pub mod registrations;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(events::routes())
        .merge(registrations::routes())
        .merge(admin::routes())
        .merge(contact::routes())
}
