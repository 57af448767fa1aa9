use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::{parse_id, ApiResult},
    middleware::{AdminUser, AuthUser, ValidatedJson},
    models::{BookedApartment, NewBookedApartment},
    repository::{DeleteOutcome, InsertOutcome},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookedApartment", post(create_booking))
        .route("/bookedApartment/{key}", get(bookings_for_user).delete(delete_booking))
}

// POST /bookedApartment
async fn create_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(booking): ValidatedJson<NewBookedApartment>,
) -> ApiResult<Json<InsertOutcome>> {
    let email = booking.user_email.clone();
    let outcome = state.repo.insert_booking(booking).await?;
    tracing::info!("Apartment booked for {}: {:?}", email, outcome.inserted_id);
    Ok(Json(outcome))
}

// GET /bookedApartment/{email}
async fn bookings_for_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<BookedApartment>>> {
    user.ensure_self(&email)?;
    Ok(Json(state.repo.list_bookings_for(&email).await?))
}

// DELETE /bookedApartment/{id}
async fn delete_booking(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo.delete_booking(id).await?))
}
