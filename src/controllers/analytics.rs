//! analytics.rs
//!
//! Сводная статистика для панели администратора.
//!
//! Включает в себя следующую функциональность:
//! - Подсчет пользователей, жильцов (member), квартир и занятых квартир.
//! - Расчет процента свободных и занятых квартир.
//! - Подсчет платежей и общей выручки (сумма `rent` считается в БД).
//!
//! Если квартир нет, все проценты равны 0 (деления на ноль не происходит).

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::{error::ApiResult, middleware::AdminUser, models::Role, AppState};

/// Определяет маршруты, связанные с аналитикой.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/admin-stats", get(get_admin_stats))
}

/// Исходные счётчики из БД.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Counts {
    pub users: u64,
    pub members: u64,
    pub apartments: u64,
    pub booked_apartments: u64,
    pub payments: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub apartment_per: f64,
    pub apartments: u64,
    pub total_members: u64,
    pub available_per: f64,
    pub booked_per: f64,
    pub booked_apartments: u64,
    pub payments: u64,
    pub revenue: f64,
}

// --- Вспомогательные функции ---

/// `part / whole * 100`, для `whole == 0`: 0.
fn percent(part: f64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part * 100.0 / whole as f64
    }
}

impl AdminStats {
    pub fn compute(counts: Counts) -> Self {
        let apartments = counts.apartments;
        let booked = counts.booked_apartments;
        // Брони не связаны с квартирами ключом, поэтому booked > apartments возможно:
        // тогда процент свободных уходит в минус, как и в исходных данных.
        let available = apartments as f64 - booked as f64;

        AdminStats {
            users: counts.users,
            apartment_per: percent(apartments as f64, apartments),
            apartments,
            total_members: counts.members,
            available_per: percent(available, apartments),
            booked_per: percent(booked as f64, apartments),
            booked_apartments: booked,
            payments: counts.payments,
            revenue: counts.revenue,
        }
    }
}

// --- Сводка ---

/// GET /admin-stats
async fn get_admin_stats(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<AdminStats>> {
    let repo = state.repo.as_ref();
    let (users, members, apartments, booked_apartments, payments, revenue) = tokio::try_join!(
        repo.count_users(None),
        repo.count_users(Some(Role::Member)),
        repo.count_apartments(),
        repo.count_bookings(),
        repo.count_payments(),
        repo.total_revenue(),
    )?;

    let stats = AdminStats::compute(Counts {
        users,
        members,
        apartments,
        booked_apartments,
        payments,
        revenue,
    });

    tracing::info!(
        "Admin stats for {}: {} apartments, {} booked, revenue {:.2}",
        admin.email, stats.apartments, stats.booked_apartments, stats.revenue
    );

    Ok(Json(stats))
}
