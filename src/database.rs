use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Transaction};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    AgreementRequest, AgreementStatus, Announcement, Apartment, BookedApartment, Coupon,
    NewAgreementRequest, NewAnnouncement, NewApartment, NewBookedApartment, NewCoupon,
    NewPayment, NewUser, Payment, Role, User,
};
use crate::repository::{
    BuildingRepository, DeleteOutcome, InsertOutcome, Page, RepoResult, RepositoryError,
    UpdateOutcome,
};

// Ключ advisory-блокировки, под которой сериализуются все смены ролей и удаления
// пользователей. Так проверка "остался ли ещё админ" не гоняется с соседними запросами.
const ROLE_CHANGE_LOCK: i64 = 0x0b11_d1e6;

const USER_COLUMNS: &str = "id, email, name, photo_url, role, created_at";

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./src/migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed");
        Ok(())
    }
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

async fn lock_role_changes(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(ROLE_CHANGE_LOCK)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn admin_count(tx: &mut Transaction<'_, Postgres>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&mut **tx)
        .await
}

/// Общая часть смены роли: `target` уже найден под блокировкой.
async fn apply_role_change(
    mut tx: Transaction<'_, Postgres>,
    target: Option<(Uuid, String)>,
    role: Role,
) -> RepoResult<UpdateOutcome> {
    let Some((id, current)) = target else {
        tx.commit().await?;
        return Ok(UpdateOutcome::new(0, 0));
    };

    if current == role.as_str() {
        tx.commit().await?;
        return Ok(UpdateOutcome::new(1, 0));
    }

    if current == Role::Admin.as_str() && admin_count(&mut tx).await? <= 1 {
        return Err(RepositoryError::LastAdmin);
    }

    sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
        .bind(id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("User {} role changed: {} -> {}", id, current, role);
    Ok(UpdateOutcome::new(1, 1))
}

#[async_trait]
impl BuildingRepository for Database {
    async fn insert_user_if_absent(&self, user: NewUser) -> RepoResult<InsertOutcome> {
        let inserted: Option<Uuid> = sqlx::query_scalar(
            "INSERT INTO users (id, email, name, photo_url, role)
             VALUES ($1, $2, $3, $4, 'user')
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.photo_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(id) => InsertOutcome::inserted(id),
            None => InsertOutcome::skipped(),
        })
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_users_by_role(&self, role: Role) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at, id"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_role_by_id(&self, id: Uuid, role: Role) -> RepoResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_role_changes(&mut tx).await?;
        let target: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, role FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        apply_role_change(tx, target, role).await
    }

    async fn set_role_by_email(&self, email: &str, role: Role) -> RepoResult<UpdateOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_role_changes(&mut tx).await?;
        let target: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, role FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?;
        apply_role_change(tx, target, role).await
    }

    async fn update_user_name(&self, email: &str, name: &str) -> RepoResult<UpdateOutcome> {
        let (matched, modified): (i64, i64) = sqlx::query_as(
            r#"
            WITH target AS (SELECT id FROM users WHERE email = $1),
                 updated AS (
                     UPDATE users SET name = $2
                     WHERE email = $1 AND name <> $2
                     RETURNING id
                 )
            SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)
            "#,
        )
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(UpdateOutcome::new(to_count(matched), to_count(modified)))
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_role_changes(&mut tx).await?;

        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(role) = role else {
            tx.commit().await?;
            return Ok(DeleteOutcome::new(0));
        };

        if role == Role::Admin.as_str() && admin_count(&mut tx).await? <= 1 {
            return Err(RepositoryError::LastAdmin);
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(DeleteOutcome::new(deleted))
    }

    async fn count_users(&self, role: Option<Role>) -> RepoResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)",
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(to_count(count))
    }

    async fn insert_coupon(&self, coupon: NewCoupon) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO coupons (id, code, discount, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&coupon.code)
        .bind(coupon.discount)
        .bind(&coupon.description)
        .execute(&self.pool)
        .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_coupons(&self) -> RepoResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(
            "SELECT id, code, discount, description, created_at
             FROM coupons ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    async fn delete_coupon(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let deleted = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(DeleteOutcome::new(deleted))
    }

    async fn insert_apartment(&self, apartment: NewApartment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO apartments (id, apartment_no, floor, block, rent, image)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(&apartment.apartment_no)
        .bind(apartment.floor)
        .bind(&apartment.block)
        .bind(apartment.rent)
        .bind(&apartment.image)
        .execute(&self.pool)
        .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_apartments(&self, page: Page) -> RepoResult<Vec<Apartment>> {
        // LIMIT NULL в PostgreSQL означает "без ограничения"
        let apartments = sqlx::query_as::<_, Apartment>(
            "SELECT id, apartment_no, floor, block, rent, image, created_at
             FROM apartments
             ORDER BY created_at, id
             OFFSET $1 LIMIT $2",
        )
        .bind(to_sql_int(page.offset))
        .bind(page.limit.map(to_sql_int))
        .fetch_all(&self.pool)
        .await?;
        Ok(apartments)
    }

    async fn count_apartments(&self) -> RepoResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM apartments")
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }

    async fn insert_booking(&self, booking: NewBookedApartment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO booked_apartments
                 (id, apartment_id, user_name, user_email, apartment_no, floor, block, rent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(booking.apartment_id)
        .bind(&booking.user_name)
        .bind(&booking.user_email)
        .bind(&booking.apartment_no)
        .bind(booking.floor)
        .bind(&booking.block)
        .bind(booking.rent)
        .execute(&self.pool)
        .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_bookings_for(&self, email: &str) -> RepoResult<Vec<BookedApartment>> {
        let bookings = sqlx::query_as::<_, BookedApartment>(
            "SELECT id, apartment_id, user_name, user_email, apartment_no, floor, block, rent,
                    accepted_at
             FROM booked_apartments
             WHERE user_email = $1
             ORDER BY accepted_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }

    async fn delete_booking(&self, id: Uuid) -> RepoResult<DeleteOutcome> {
        let deleted = sqlx::query("DELETE FROM booked_apartments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(DeleteOutcome::new(deleted))
    }

    async fn count_bookings(&self) -> RepoResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM booked_apartments")
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }

    async fn insert_agreement(&self, request: NewAgreementRequest) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO agreement_requests
                 (id, user_name, user_email, apartment_id, apartment_no, floor, block, rent, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id)
        .bind(&request.user_name)
        .bind(&request.user_email)
        .bind(request.apartment_id)
        .bind(&request.apartment_no)
        .bind(request.floor)
        .bind(&request.block)
        .bind(request.rent)
        .bind(AgreementStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_agreements(&self) -> RepoResult<Vec<AgreementRequest>> {
        let requests = sqlx::query_as::<_, AgreementRequest>(
            "SELECT id, user_name, user_email, apartment_id, apartment_no, floor, block, rent,
                    status, requested_at
             FROM agreement_requests
             ORDER BY requested_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn set_agreement_status(
        &self,
        id: Uuid,
        status: AgreementStatus,
    ) -> RepoResult<UpdateOutcome> {
        let (matched, modified): (i64, i64) = sqlx::query_as(
            r#"
            WITH target AS (SELECT id FROM agreement_requests WHERE id = $1),
                 updated AS (
                     UPDATE agreement_requests SET status = $2
                     WHERE id = $1 AND status <> $2
                     RETURNING id
                 )
            SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(UpdateOutcome::new(to_count(matched), to_count(modified)))
    }

    async fn insert_announcement(
        &self,
        announcement: NewAnnouncement,
    ) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO announcements (id, title, description) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&announcement.title)
            .bind(&announcement.description)
            .execute(&self.pool)
            .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_announcements(&self) -> RepoResult<Vec<Announcement>> {
        let announcements = sqlx::query_as::<_, Announcement>(
            "SELECT id, title, description, created_at
             FROM announcements ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(announcements)
    }

    async fn insert_payment(&self, payment: NewPayment) -> RepoResult<InsertOutcome> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO payments (id, email, name, apartment_no, month, rent, transaction_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(id)
        .bind(&payment.email)
        .bind(&payment.name)
        .bind(&payment.apartment_no)
        .bind(&payment.month)
        .bind(payment.rent)
        .bind(&payment.transaction_id)
        .execute(&self.pool)
        .await?;
        Ok(InsertOutcome::inserted(id))
    }

    async fn list_payments_for(&self, email: &str) -> RepoResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT id, email, name, apartment_no, month, rent, transaction_id, paid_at
             FROM payments
             WHERE email = $1
             ORDER BY paid_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    async fn count_payments(&self) -> RepoResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(to_count(count))
    }

    async fn total_revenue(&self) -> RepoResult<f64> {
        let revenue: f64 = sqlx::query_scalar("SELECT COALESCE(SUM(rent), 0)::float8 FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(revenue)
    }
}
