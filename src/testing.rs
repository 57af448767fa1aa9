//! Тестовые двойники: хранилище в памяти, заглушка платёжного провайдера
//! и почтовый клиент, который складывает письма в канал.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Config, DatabaseConfig, JwtConfig, LogFormat, MailConfig, PaymentConfig},
    models::{
        AgreementRequest, AgreementStatus, Announcement, Apartment, BookedApartment, Coupon,
        NewAgreementRequest, NewAnnouncement, NewApartment, NewBookedApartment, NewCoupon,
        NewPayment, NewUser, Payment, Role, User,
    },
    repository::{
        BuildingRepository, DeleteOutcome, InsertOutcome, Page, RepoResult, RepositoryError,
        UpdateOutcome,
    },
    services::{
        notification::{MailError, Mailer, Notifier, OutgoingMail},
        payment::{PaymentError, PaymentGateway, PaymentIntent},
        token,
    },
    AppState,
};

pub const TEST_SECRET: &str = "test-access-token-secret";

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            log_format: LogFormat::Pretty,
        },
        database: DatabaseConfig { url: "postgres://unused".to_string(), pool_size: 1 },
        jwt: JwtConfig { secret: TEST_SECRET.to_string() },
        payment: PaymentConfig {
            secret_key: "sk_test".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            currency: "usd".to_string(),
        },
        mail: MailConfig {
            api_key: "key-test".to_string(),
            domain: "mg.example.com".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            from: "Building <postmaster@mg.example.com>".to_string(),
            recipient: "office@example.com".to_string(),
        },
    }
}

// --- repository ---

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    coupons: Vec<Coupon>,
    apartments: Vec<Apartment>,
    bookings: Vec<BookedApartment>,
    agreements: Vec<AgreementRequest>,
    announcements: Vec<Announcement>,
    payments: Vec<Payment>,
}

impl Collections {
    fn admins(&self) -> usize {
        self.users.iter().filter(|u| u.role == Role::Admin).count()
    }

    fn change_role(&mut self, index: Option<usize>, role: Role) -> RepoResult<UpdateOutcome> {
        let Some(index) = index else {
            return Ok(UpdateOutcome::new(0, 0));
        };
        let current = self.users[index].role;
        if current == role {
            return Ok(UpdateOutcome::new(1, 0));
        }
        if current == Role::Admin && self.admins() <= 1 {
            return Err(RepositoryError::LastAdmin);
        }
        self.users[index].role = role;
        Ok(UpdateOutcome::new(1, 1))
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Collections>,
}

impl MemoryRepository {
    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().expect("memory repository poisoned")
    }

    pub fn seed_user(&self, email: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.push(User {
            id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            photo_url: None,
            role,
            created_at: Utc::now(),
        });
        id
    }

    pub fn user(&self, email: &str) -> Option<User> {
        self.lock().users.iter().find(|u| u.email == email).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn agreement(&self, id: Uuid) -> Option<AgreementRequest> {
        self.lock().agreements.iter().find(|a| a.id == id).cloned()
    }
}

#[async_trait]
impl BuildingRepository for MemoryRepository {
    async fn insert_user_if_absent(&self, user: NewUser) -> RepoResult<InsertOutcome> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Ok(InsertOutcome::skipped());
        }
        let id = Uuid::new_v4();
        inner.users.push(User {
            id,
            email: user.email,
            name: user.name,
            photo_url: user.photo_url,
            role: Role::User,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.lock().users.clone())
    }

    async fn list_users_by_role(&self, role: Role) -> RepoResult<Vec<User>> {
        Ok(self.lock().users.iter().filter(|u| u.role == role).cloned().collect())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.user(email))
    }

    async fn set_role_by_id(&self, id: Uuid, role: Role) -> RepoResult<UpdateOutcome> {
        let mut inner = self.lock();
        let index = inner.users.iter().position(|u| u.id == id);
        inner.change_role(index, role)
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> RepoResult<UpdateOutcome> {
        let mut inner = self.lock();
        let index = inner.users.iter().position(|u| u.email == email);
        inner.change_role(index, role)
    }

    async fn update_user_name(&self, email: &str, name: &str) -> RepoResult<UpdateOutcome> {
        let mut inner = self.lock();
        match inner.users.iter_mut().find(|u| u.email == email) {
            None => Ok(UpdateOutcome::new(0, 0)),
            Some(user) if user.name == name => Ok(UpdateOutcome::new(1, 0)),
            Some(user) => {
                user.name = name.to_string();
                Ok(UpdateOutcome::new(1, 1))
            }
        }
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let mut inner = self.lock();
        let Some(index) = inner.users.iter().position(|u| u.id == id) else {
            return Ok(DeleteOutcome::new(0));
        };
        if inner.users[index].role == Role::Admin && inner.admins() <= 1 {
            return Err(RepositoryError::LastAdmin);
        }
        inner.users.remove(index);
        Ok(DeleteOutcome::new(1))
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<u64> {
        let inner = self.lock();
        let count = inner.users.iter().filter(|u| role.map_or(true, |r| u.role == r)).count();
        Ok(count as u64)
    }

    async fn insert_coupon(&self, coupon: NewCoupon) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().coupons.push(Coupon {
            id,
            code: coupon.code,
            discount: coupon.discount,
            description: coupon.description,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_coupons(&self) -> RepoResult<Vec<Coupon>> {
        Ok(self.lock().coupons.clone())
    }

    async fn delete_coupon(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let mut inner = self.lock();
        let before = inner.coupons.len();
        inner.coupons.retain(|c| c.id != id);
        Ok(DeleteOutcome::new((before - inner.coupons.len()) as u64))
    }

    async fn insert_apartment(&self, apartment: NewApartment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().apartments.push(Apartment {
            id,
            apartment_no: apartment.apartment_no,
            floor: apartment.floor,
            block: apartment.block,
            rent: apartment.rent,
            image: apartment.image,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_apartments(&self, page: Page) -> RepoResult<Vec<Apartment>> {
        let inner = self.lock();
        let skipped = inner.apartments.iter().skip(page.offset as usize);
        Ok(match page.limit {
            Some(limit) => skipped.take(limit as usize).cloned().collect(),
            None => skipped.cloned().collect(),
        })
    }

    async fn count_apartments(&self) -> RepoResult<u64> {
        Ok(self.lock().apartments.len() as u64)
    }

    async fn insert_booking(&self, booking: NewBookedApartment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().bookings.push(BookedApartment {
            id,
            apartment_id: booking.apartment_id,
            user_name: booking.user_name,
            user_email: booking.user_email,
            apartment_no: booking.apartment_no,
            floor: booking.floor,
            block: booking.block,
            rent: booking.rent,
            accepted_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_bookings_for(&self, email: &str) -> RepoResult<Vec<BookedApartment>> {
        let inner = self.lock();
        Ok(inner.bookings.iter().filter(|b| b.user_email == email).cloned().collect())
    }

    async fn delete_booking(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let mut inner = self.lock();
        let before = inner.bookings.len();
        inner.bookings.retain(|b| b.id != id);
        Ok(DeleteOutcome::new((before - inner.bookings.len()) as u64))
    }

    async fn count_bookings(&self) -> RepoResult<u64> {
        Ok(self.lock().bookings.len() as u64)
    }

    async fn insert_agreement(&self, request: NewAgreementRequest) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().agreements.push(AgreementRequest {
            id,
            user_name: request.user_name,
            user_email: request.user_email,
            apartment_id: request.apartment_id,
            apartment_no: request.apartment_no,
            floor: request.floor,
            block: request.block,
            rent: request.rent,
            status: AgreementStatus::Pending,
            requested_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_agreements(&self) -> RepoResult<Vec<AgreementRequest>> {
        Ok(self.lock().agreements.clone())
    }

    async fn set_agreement_status(
        &self,
        id: Uuid,
        status: AgreementStatus,
    ) -> RepoResult<UpdateOutcome> {
        let mut inner = self.lock();
        match inner.agreements.iter_mut().find(|a| a.id == id) {
            None => Ok(UpdateOutcome::new(0, 0)),
            Some(a) if a.status == status => Ok(UpdateOutcome::new(1, 0)),
            Some(a) => {
                a.status = status;
                Ok(UpdateOutcome::new(1, 1))
            }
        }
    }

    async fn insert_announcement(
        &self,
        announcement: NewAnnouncement,
    ) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().announcements.push(Announcement {
            id,
            title: announcement.title,
            description: announcement.description,
            created_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_announcements(&self) -> RepoResult<Vec<Announcement>> {
        Ok(self.lock().announcements.clone())
    }

    async fn insert_payment(&self, payment: NewPayment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        self.lock().payments.push(Payment {
            id,
            email: payment.email,
            name: payment.name,
            apartment_no: payment.apartment_no,
            month: payment.month,
            rent: payment.rent,
            transaction_id: payment.transaction_id,
            paid_at: Utc::now(),
        });
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_payments_for(&self, email: &str) -> RepoResult<Vec<Payment>> {
        let inner = self.lock();
        Ok(inner.payments.iter().filter(|p| p.email == email).cloned().collect())
    }

    async fn count_payments(&self) -> RepoResult<u64> {
        Ok(self.lock().payments.len() as u64)
    }

    async fn total_revenue(&self) -> RepoResult<f64> {
        Ok(self.lock().payments.iter().map(|p| p.rent).sum())
    }
}

// --- external providers ---

#[derive(Default)]
pub struct StubPayments {
    pub amounts: Mutex<Vec<i64>>,
    pub fail: bool,
}

#[async_trait]
impl PaymentGateway for StubPayments {
    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        self.amounts.lock().expect("stub poisoned").push(amount);
        if self.fail {
            return Err(PaymentError::Rejected { status: 402, message: "card declined".into() });
        }
        Ok(PaymentIntent {
            id: format!("pi_{amount}"),
            client_secret: format!("pi_{amount}_secret"),
            amount,
            currency: "usd".to_string(),
        })
    }
}

pub struct RecordingMailer {
    sent: mpsc::UnboundedSender<OutgoingMail>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.send(mail.clone()).map_err(|_| MailError::Abandoned)
    }
}

// --- router harness ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub payments: Arc<StubPayments>,
    pub mail: mpsc::UnboundedReceiver<OutgoingMail>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_payments(StubPayments::default())
    }

    pub fn with_payments(payments: StubPayments) -> Self {
        let repo = Arc::new(MemoryRepository::default());
        let payments = Arc::new(payments);
        let (tx, mail) = mpsc::unbounded_channel();
        let state = Arc::new(AppState {
            repo: repo.clone(),
            payments: payments.clone(),
            notifier: Notifier::new(Arc::new(RecordingMailer { sent: tx }), "office@example.com"),
            config: test_config(),
        });

        Self { router: crate::controllers::app(state), repo, payments, mail }
    }

    pub fn token(&self, email: &str) -> String {
        token::issue_token(email, TEST_SECRET).expect("token")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}
