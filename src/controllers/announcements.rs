use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;

use crate::{
    error::ApiResult,
    middleware::{AdminUser, ValidatedJson},
    models::{Announcement, NewAnnouncement},
    repository::InsertOutcome,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/announcement", get(list_announcements).post(create_announcement))
}

async fn create_announcement(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(announcement): ValidatedJson<NewAnnouncement>,
) -> ApiResult<Json<InsertOutcome>> {
    let outcome = state.repo.insert_announcement(announcement).await?;
    tracing::info!("Announcement posted by {}: {:?}", admin.email, outcome.inserted_id);
    Ok(Json(outcome))
}

async fn list_announcements(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Announcement>>> {
    Ok(Json(state.repo.list_announcements().await?))
}
