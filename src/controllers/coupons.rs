use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::{parse_id, ApiResult},
    middleware::{AdminUser, ValidatedJson},
    models::{Coupon, NewCoupon},
    repository::{DeleteOutcome, InsertOutcome},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coupon", get(list_coupons).post(create_coupon))
        .route("/coupon/{id}", delete(delete_coupon))
}

// GET /coupon: публичный
async fn list_coupons(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Coupon>>> {
    Ok(Json(state.repo.list_coupons().await?))
}

// POST /coupon
async fn create_coupon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(coupon): ValidatedJson<NewCoupon>,
) -> ApiResult<Json<InsertOutcome>> {
    let code = coupon.code.clone();
    let outcome = state.repo.insert_coupon(coupon).await?;
    tracing::info!("Coupon {} created: {:?}", code, outcome.inserted_id);
    Ok(Json(outcome))
}

// DELETE /coupon/{id}
async fn delete_coupon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let id = parse_id(&id)?;
    Ok(Json(state.repo.delete_coupon(id).await?))
}
