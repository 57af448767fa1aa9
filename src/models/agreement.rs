use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Статус заявки на договор аренды. Значения совпадают с тем,
/// что присылает фронтенд: `pending`, `Accepted`, `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementStatus {
    #[serde(rename = "pending")]
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown agreement status `{0}`")]
pub struct UnknownStatus(pub String);

impl AgreementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementStatus::Pending => "pending",
            AgreementStatus::Accepted => "Accepted",
            AgreementStatus::Rejected => "Rejected",
        }
    }
}

impl TryFrom<String> for AgreementStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(AgreementStatus::Pending),
            "Accepted" => Ok(AgreementStatus::Accepted),
            "Rejected" => Ok(AgreementStatus::Rejected),
            _ => Err(UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub apartment_id: Option<Uuid>,
    pub apartment_no: String,
    pub floor: i32,
    pub block: String,
    pub rent: f64,
    #[serde(rename = "Status")]
    #[sqlx(try_from = "String")]
    pub status: AgreementStatus,
    pub requested_at: DateTime<Utc>,
}

// POST /agreementRequests. Новая заявка всегда в статусе `pending`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewAgreementRequest {
    #[validate(length(min = 1, max = 120))]
    pub user_name: String,
    #[validate(email)]
    pub user_email: String,
    pub apartment_id: Option<Uuid>,
    #[validate(length(min = 1, max = 32))]
    pub apartment_no: String,
    #[validate(range(min = 0, max = 200))]
    pub floor: i32,
    #[validate(length(min = 1, max = 32))]
    pub block: String,
    #[validate(range(min = 0.0))]
    pub rent: f64,
}

// PATCH /agreementRequests/{id}
//
// `action` выбирает шаблон письма и не проверяется на согласованность со `Status`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AgreementUpdate {
    #[serde(rename = "Status")]
    pub status: Option<AgreementStatus>,
    #[validate(length(max = 32))]
    pub action: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_front_end_spelling() {
        let update: AgreementUpdate =
            serde_json::from_str(r#"{"Status":"Accepted","action":"Accepted"}"#).unwrap();
        assert_eq!(update.status, Some(AgreementStatus::Accepted));

        let pending: AgreementStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(pending, AgreementStatus::Pending);
        assert!(serde_json::from_str::<AgreementStatus>(r#""accepted""#).is_err());
    }

    #[test]
    fn update_without_status_is_allowed() {
        let update: AgreementUpdate = serde_json::from_str(r#"{"action":"noop"}"#).unwrap();
        assert!(update.status.is_none());
    }
}
