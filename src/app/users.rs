use crate::accounts::{self, RoleChoice};
use crate::auth::TokenClaims;
use crate::error::AppError;
use crate::roles;
use crate::state::AppState;
use crate::types::user::{NewUser, ProfileUpdate, UserView};

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(accounts::find_user(
        state.store.as_ref(),
        &claims.user_id,
    )?))
}

pub(crate) async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserView>, AppError> {
    let user = accounts::update_profile(
        state.store.as_ref(),
        &claims.user_id,
        update,
        RoleChoice::SelfService,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PasswordChange {
    current_password: String,
    new_password: String,
}

pub(crate) async fn change_my_password(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(change): Json<PasswordChange>,
) -> Result<Json<UserView>, AppError> {
    let user = accounts::change_password(
        state.store.as_ref(),
        &claims.user_id,
        &change.current_password,
        &change.new_password,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(user))
}

#[derive(Debug, Serialize)]
pub(crate) struct PermissionsResponse {
    permissions: Vec<u16>,
}

/// Current permissions of the caller's role, which may differ from the token snapshot.
pub(crate) async fn my_permissions(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<PermissionsResponse>, AppError> {
    let store = state.store.as_ref();
    let user = store
        .find_user(&claims.user_id)?
        .ok_or(AppError::NotFound("User"))?;
    let permissions = roles::resolve_permissions(store, &user.role_id)?;
    Ok(Json(PermissionsResponse { permissions }))
}

pub(crate) async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, AppError> {
    Ok(Json(accounts::list_users(state.store.as_ref())?))
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(accounts::find_user(state.store.as_ref(), &id)?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Json(profile): Json<NewUser>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let user = accounts::register(
        state.store.as_ref(),
        profile,
        RoleChoice::Administrator,
        OffsetDateTime::now_utc(),
    )?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserView>, AppError> {
    let user = accounts::update_profile(
        state.store.as_ref(),
        &id,
        update,
        RoleChoice::Administrator,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(user))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    accounts::delete_user(state.store.as_ref(), &id)?;
    Ok(StatusCode::NO_CONTENT)
}
