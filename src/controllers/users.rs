//! users.rs
//!
//! Пользователи и роли.
//!
//! - Регистрация идемпотентна по email.
//! - Роль меняется только администратором, три отдельные операции:
//!   сделать админом (по id), сделать жильцом-member (по email),
//!   вернуть в `user` (по id). Снять роль с последнего админа нельзя (409).
//! - Флаги admin/member отдаются только самому пользователю.

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{parse_id, ApiResult},
    middleware::{AdminUser, AuthUser, ValidatedJson},
    models::{NewUser, ProfileUpdate, Role, User},
    repository::{DeleteOutcome, InsertOutcome, UpdateOutcome},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user).get(list_users).patch(update_profile))
        .route("/members", get(list_members))
        .route("/users/admin/{target}", get(admin_flag).patch(promote_to_admin))
        .route("/users/member/{email}", get(member_flag).patch(make_member))
        .route("/users/{id}", patch(demote_to_user).delete(delete_user))
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub outcome: InsertOutcome,
}

// POST /users
async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(user): ValidatedJson<NewUser>,
) -> ApiResult<Json<CreateUserResponse>> {
    let email = user.email.clone();
    let outcome = state.repo.insert_user_if_absent(user).await?;

    let message = match outcome.inserted_id {
        Some(id) => {
            tracing::info!("User {} registered with id {}", email, id);
            None
        }
        None => {
            tracing::debug!("User {} already exists, skipping insert", email);
            Some("User already exist".to_string())
        }
    };

    Ok(Json(CreateUserResponse { message, outcome }))
}

// GET /users
async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

// PATCH /users: смена имени в собственном профиле
async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(update): ValidatedJson<ProfileUpdate>,
) -> ApiResult<Json<UpdateOutcome>> {
    user.ensure_self(&update.email)?;
    let outcome = state.repo.update_user_name(&update.email, &update.name).await?;
    Ok(Json(outcome))
}

// GET /members
async fn list_members(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users_by_role(Role::Member).await?))
}

#[derive(Debug, Serialize)]
pub struct AdminFlag {
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct MemberFlag {
    pub member: bool,
}

async fn has_role(state: &AppState, email: &str, role: Role) -> ApiResult<bool> {
    let user = state.repo.find_user_by_email(email).await?;
    Ok(user.is_some_and(|u| u.role == role))
}

// GET /users/admin/{email}
async fn admin_flag(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<AdminFlag>> {
    user.ensure_self(&email)?;
    let admin = has_role(&state, &email, Role::Admin).await?;
    Ok(Json(AdminFlag { admin }))
}

// GET /users/member/{email}
async fn member_flag(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(email): Path<String>,
) -> ApiResult<Json<MemberFlag>> {
    user.ensure_self(&email)?;
    let member = has_role(&state, &email, Role::Member).await?;
    Ok(Json(MemberFlag { member }))
}

// PATCH /users/admin/{id}
async fn promote_to_admin(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<UpdateOutcome>> {
    let id = parse_id(&id)?;
    let outcome = state.repo.set_role_by_id(id, Role::Admin).await?;
    tracing::info!("{} promoted user {} to admin: {:?}", admin.email, id, outcome);
    Ok(Json(outcome))
}

// PATCH /users/member/{email}
async fn make_member(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(email): Path<String>,
) -> ApiResult<Json<UpdateOutcome>> {
    let outcome = state.repo.set_role_by_email(&email, Role::Member).await?;
    tracing::info!("{} set {} as member: {:?}", admin.email, email, outcome);
    Ok(Json(outcome))
}

// PATCH /users/{id}
async fn demote_to_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<UpdateOutcome>> {
    let id = parse_id(&id)?;
    let outcome = state.repo.set_role_by_id(id, Role::User).await?;
    tracing::info!("{} demoted user {}: {:?}", admin.email, id, outcome);
    Ok(Json(outcome))
}

// DELETE /users/{id}. Брони и платежи пользователя остаются
async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteOutcome>> {
    let id = parse_id(&id)?;
    let outcome = state.repo.delete_user(id).await?;
    tracing::info!("{} deleted user {}: {:?}", admin.email, id, outcome);
    Ok(Json(outcome))
}
