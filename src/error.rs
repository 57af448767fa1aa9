use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::repository::RepositoryError;
use crate::services::{payment::PaymentError, token::TokenError};

/// Ошибки HTTP-слоя. Внутренние подробности пишутся в лог, клиенту уходит
/// только короткое сообщение.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized access")]
    Unauthenticated,
    #[error("forbidden access")]
    Forbidden,
    #[error("{0}")]
    BadRequest(String),
    #[error("the last remaining admin cannot be demoted or removed")]
    LastAdmin,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::LastAdmin => ApiError::LastAdmin,
            other => ApiError::Repository(other),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::LastAdmin => StatusCode::CONFLICT,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
            ApiError::Repository(_) | ApiError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                "Database error".to_string()
            }
            ApiError::Token(e) => {
                tracing::error!("Token error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Payment(e) => {
                tracing::error!("Payment provider error: {}", e);
                "Payment provider error. Please try again later.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { success: false, message })).into_response()
    }
}

/// Разбирает идентификатор из пути. Некорректный id: 400, а не 500.
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid id `{raw}`")))
}
