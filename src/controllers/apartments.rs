use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiResult,
    middleware::{AdminUser, ValidatedJson, ValidatedQuery},
    models::{Apartment, NewApartment},
    repository::{InsertOutcome, Page},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/apartment", get(list_apartments).post(create_apartment))
        .route("/apartmentsCount", get(apartments_count))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApartmentsQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// POST /apartment
async fn create_apartment(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    ValidatedJson(apartment): ValidatedJson<NewApartment>,
) -> ApiResult<Json<InsertOutcome>> {
    let outcome = state.repo.insert_apartment(apartment).await?;
    tracing::info!("Apartment created: {:?}", outcome.inserted_id);
    Ok(Json(outcome))
}

// GET /apartment?page=&size=
async fn list_apartments(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<ApartmentsQuery>,
) -> ApiResult<Json<Vec<Apartment>>> {
    let page = Page::from_query(params.page, params.size);
    Ok(Json(state.repo.list_apartments(page).await?))
}

// GET /apartmentsCount: клиенту этого хватает, чтобы посчитать число страниц
async fn apartments_count(State(state): State<Arc<AppState>>) -> ApiResult<Json<CountResponse>> {
    let count = state.repo.count_apartments().await?;
    Ok(Json(CountResponse { count }))
}
