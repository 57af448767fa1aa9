use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiResult,
    middleware::{AuthUser, ValidatedJson},
    models::{NewPayment, Payment},
    repository::InsertOutcome,
    services::payment::to_minor_units,
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payments", post(record_payment))
        .route("/payments/{email}", get(payments_for_user))
}

// --- Request/Response структуры ---
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PaymentIntentRequest {
    /// Цена в основных единицах валюты.
    #[validate(range(min = 0.0))]
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// POST /create-payment-intent
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PaymentIntentRequest>,
) -> ApiResult<Json<PaymentIntentResponse>> {
    let amount = to_minor_units(req.price);
    let intent = state.payments.create_payment_intent(amount).await?;

    Ok(Json(PaymentIntentResponse { client_secret: intent.client_secret }))
}

/// POST /payments
pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payment): ValidatedJson<NewPayment>,
) -> ApiResult<Json<InsertOutcome>> {
    tracing::info!(
        "Payment info: email={}, month={}, rent={}, transaction={}",
        payment.email, payment.month, payment.rent, payment.transaction_id
    );
    Ok(Json(state.repo.insert_payment(payment).await?))
}

/// GET /payments/{email}
pub async fn payments_for_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    user.ensure_self(&email)?;
    Ok(Json(state.repo.list_payments_for(&email).await?))
}
