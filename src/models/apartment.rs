use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Apartment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub apartment_no: String,
    pub floor: i32,
    pub block: String,
    pub rent: f64,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewApartment {
    #[validate(length(min = 1, max = 32))]
    pub apartment_no: String,
    #[validate(range(min = 0, max = 200))]
    pub floor: i32,
    #[validate(length(min = 1, max = 32))]
    pub block: String,
    #[validate(range(min = 0.0))]
    pub rent: f64,
    #[validate(url)]
    pub image: String,
}
