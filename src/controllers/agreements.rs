//! agreements.rs
//!
//! Заявки на договор аренды.
//!
//! Обновление статуса доступно только администратору. После записи, независимо
//! от её результата, по полю `action` выбирается письмо ("Accepted" / "Rejected")
//! и отправка запускается в фоне. Ответ не ждёт почтового провайдера.

use axum::{
    extract::{Path, State},
    routing::{get, patch},
    Json, Router,
};
use std::sync::Arc;

use crate::{
    error::{parse_id, ApiResult},
    middleware::{AdminUser, AuthUser, ValidatedJson},
    models::{AgreementRequest, AgreementUpdate, NewAgreementRequest},
    repository::{InsertOutcome, UpdateOutcome},
    services::notification::Decision,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agreementRequests", get(list_agreements).post(create_agreement))
        .route("/agreementRequests/{id}", patch(update_agreement_status))
}

// POST /agreementRequests
async fn create_agreement(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<NewAgreementRequest>,
) -> ApiResult<Json<InsertOutcome>> {
    let outcome = state.repo.insert_agreement(request).await?;
    tracing::info!("Agreement request from {}: {:?}", user.email, outcome.inserted_id);
    Ok(Json(outcome))
}

// GET /agreementRequests
async fn list_agreements(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<AgreementRequest>>> {
    Ok(Json(state.repo.list_agreements().await?))
}

// PATCH /agreementRequests/{id}
async fn update_agreement_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<AgreementUpdate>,
) -> ApiResult<Json<UpdateOutcome>> {
    let id = parse_id(&id)?;

    // Без `Status` записывать нечего
    let written = match update.status {
        Some(status) => state.repo.set_agreement_status(id, status).await,
        None => Ok(UpdateOutcome::new(0, 0)),
    };

    match update.action.as_deref().and_then(Decision::from_action) {
        Some(decision) => {
            tracing::info!("{} decided agreement {}: {:?}", admin.email, id, decision);
            state.notifier.dispatch(decision).detach();
        }
        None => tracing::debug!("No notification for agreement {} (action={:?})", id, update.action),
    }

    Ok(Json(written?))
}
