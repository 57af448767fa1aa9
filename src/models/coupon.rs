use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub code: String,
    pub discount: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCoupon {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    // Скидка в процентах
    #[validate(range(min = 0.0, max = 100.0))]
    pub discount: f64,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
}
