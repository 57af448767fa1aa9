use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    models::Role,
    repository::BuildingRepository,
    services::token,
    AppState,
};

mod validation;

pub use validation::{ValidatedJson, ValidatedQuery};

/// Пользователь с проверенным JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
}

impl AuthUser {
    /// Email в пути должен совпадать с email из токена, роль не важна.
    pub fn ensure_self(&self, email: &str) -> Result<(), ApiError> {
        if self.email == email {
            Ok(())
        } else {
            tracing::debug!("Self-match failed: token={} path={}", self.email, email);
            Err(ApiError::Forbidden)
        }
    }
}

/// Пользователь с проверенным JWT и ролью `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Второй шаг после проверки токена: роль берётся из базы, не из токена.
/// Нет записи или роль другая: 403.
pub async fn require_role(
    repo: &dyn BuildingRepository,
    email: &str,
    required: Role,
) -> Result<(), ApiError> {
    let user = repo.find_user_by_email(email).await?;
    match user {
        Some(user) if user.role == required => Ok(()),
        _ => {
            tracing::debug!("Role gate denied {} (required {})", email, required);
            Err(ApiError::Forbidden)
        }
    }
}

// Bearer JWT extractor
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;

        let claims = token::verify_token(token, &state.config.jwt.secret).map_err(|e| {
            tracing::debug!("Token verification failed: {}", e);
            ApiError::Unauthenticated
        })?;

        Ok(AuthUser { email: claims.email })
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(state.repo.as_ref(), &user.email, Role::Admin).await?;
        Ok(AdminUser(user))
    }
}
