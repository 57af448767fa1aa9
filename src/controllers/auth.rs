use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::ApiResult,
    middleware::ValidatedJson,
    services::token::{issue_token, IdentityPayload},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/jwt", post(issue_jwt))
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// POST /jwt
async fn issue_jwt(
    State(state): State<Arc<AppState>>,
    ValidatedJson(identity): ValidatedJson<IdentityPayload>,
) -> ApiResult<Json<TokenResponse>> {
    let token = issue_token(&identity.email, &state.config.jwt.secret)?;
    tracing::debug!("Issued token for {}", identity.email);
    Ok(Json(TokenResponse { token }))
}
