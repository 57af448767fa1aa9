use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Запись об оплате аренды. Только добавление, без изменений.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub apartment_no: String,
    pub month: String,
    pub rent: f64,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPayment {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub apartment_no: String,
    #[validate(length(min = 1, max = 32))]
    pub month: String,
    #[validate(range(min = 0.0))]
    pub rent: f64,
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: String,
}
