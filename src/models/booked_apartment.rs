use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Квартира, закреплённая за жильцом после одобрения заявки.
/// Владелец определяется только по `user_email`, внешних ключей нет.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedApartment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub apartment_id: Option<Uuid>,
    pub user_name: String,
    pub user_email: String,
    pub apartment_no: String,
    pub floor: i32,
    pub block: String,
    pub rent: f64,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBookedApartment {
    pub apartment_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120))]
    pub user_name: String,
    #[validate(email)]
    pub user_email: String,
    #[validate(length(min = 1, max = 32))]
    pub apartment_no: String,
    #[validate(range(min = 0, max = 200))]
    pub floor: i32,
    #[validate(length(min = 1, max = 32))]
    pub block: String,
    #[validate(range(min = 0.0))]
    pub rent: f64,
}
