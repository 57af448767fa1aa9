//! repository.rs
//!
//! Слой доступа к данным. Обработчики работают только через трейт
//! [`BuildingRepository`], который лежит в `AppState` как `Arc<dyn ...>`.
//! Боевая реализация: `database::Database` (PostgreSQL), в тестах
//! используется реализация в памяти.
//!
//! Каждая операция соответствует ровно одному действию над коллекцией и
//! возвращает "сырой" результат: id вставки, количество найденных/изменённых
//! или удалённых записей.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    AgreementRequest, AgreementStatus, Announcement, Apartment, BookedApartment, Coupon,
    NewAgreementRequest, NewAnnouncement, NewApartment, NewBookedApartment, NewCoupon,
    NewPayment, NewUser, Payment, Role, User,
};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Операция оставила бы систему без единого администратора.
    #[error("the last remaining admin cannot lose the admin role")]
    LastAdmin,
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    pub inserted_id: Option<Uuid>,
}

impl InsertOutcome {
    pub fn inserted(id: Uuid) -> Self {
        Self { acknowledged: true, inserted_id: Some(id) }
    }

    pub fn skipped() -> Self {
        Self { acknowledged: true, inserted_id: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateOutcome {
    pub fn new(matched_count: u64, modified_count: u64) -> Self {
        Self { acknowledged: true, matched_count, modified_count }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn new(deleted_count: u64) -> Self {
        Self { acknowledged: true, deleted_count }
    }
}

/// Окно выборки для постраничного вывода. `limit = None` означает "до конца".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    /// offset = page * size. Без `size` выборка не ограничена.
    pub fn from_query(page: Option<u64>, size: Option<u64>) -> Self {
        let page = page.unwrap_or(0);
        match size {
            Some(size) => Page { offset: page.saturating_mul(size), limit: Some(size) },
            None => Page { offset: 0, limit: None },
        }
    }
}

#[async_trait]
pub trait BuildingRepository: Send + Sync {
    // --- users ---

    /// Вставляет пользователя, если email ещё не занят. Иначе `inserted_id = None`.
    async fn insert_user_if_absent(&self, user: NewUser) -> RepoResult<InsertOutcome>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn list_users_by_role(&self, role: Role) -> RepoResult<Vec<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Меняет роль; отказывает с `LastAdmin`, если снимается последний админ.
    async fn set_role_by_id(&self, id: Uuid, role: Role) -> RepoResult<UpdateOutcome>;
    async fn set_role_by_email(&self, email: &str, role: Role) -> RepoResult<UpdateOutcome>;
    async fn update_user_name(&self, email: &str, name: &str) -> RepoResult<UpdateOutcome>;
    /// Удаляет пользователя; отказывает с `LastAdmin` для последнего админа.
    async fn delete_user(&self, id: Uuid) -> RepoResult<DeleteOutcome>;
    async fn count_users(&self, role: Option<Role>) -> RepoResult<u64>;

    // --- coupons ---
    async fn insert_coupon(&self, coupon: NewCoupon) -> RepoResult<InsertOutcome>;
    async fn list_coupons(&self) -> RepoResult<Vec<Coupon>>;
    async fn delete_coupon(&self, id: Uuid) -> RepoResult<DeleteOutcome>;

    // --- apartments ---
    async fn insert_apartment(&self, apartment: NewApartment) -> RepoResult<InsertOutcome>;
    async fn list_apartments(&self, page: Page) -> RepoResult<Vec<Apartment>>;
    async fn count_apartments(&self) -> RepoResult<u64>;

    // --- booked apartments ---
    async fn insert_booking(&self, booking: NewBookedApartment) -> RepoResult<InsertOutcome>;
    async fn list_bookings_for(&self, email: &str) -> RepoResult<Vec<BookedApartment>>;
    async fn delete_booking(&self, id: Uuid) -> RepoResult<DeleteOutcome>;
    async fn count_bookings(&self) -> RepoResult<u64>;

    // --- agreement requests ---
    async fn insert_agreement(&self, request: NewAgreementRequest) -> RepoResult<InsertOutcome>;
    async fn list_agreements(&self) -> RepoResult<Vec<AgreementRequest>>;
    async fn set_agreement_status(
        &self,
        id: Uuid,
        status: AgreementStatus,
    ) -> RepoResult<UpdateOutcome>;

    // --- announcements ---
    async fn insert_announcement(&self, announcement: NewAnnouncement)
        -> RepoResult<InsertOutcome>;
    async fn list_announcements(&self) -> RepoResult<Vec<Announcement>>;

    // --- payments ---
    async fn insert_payment(&self, payment: NewPayment) -> RepoResult<InsertOutcome>;
    async fn list_payments_for(&self, email: &str) -> RepoResult<Vec<Payment>>;
    async fn count_payments(&self) -> RepoResult<u64>;
    /// Сумма `rent` по всем платежам, считается на стороне БД.
    async fn total_revenue(&self) -> RepoResult<f64>;
}
