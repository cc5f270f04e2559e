use crate::error::AppError;
use crate::roles::{self, RoleInput};
use crate::state::AppState;
use crate::types::role::Role;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub(crate) async fn list(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(state.store.list_roles()?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Json(input): Json<RoleInput>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = roles::create_role(state.store.as_ref(), input)?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<RoleInput>,
) -> Result<Json<Role>, AppError> {
    Ok(Json(roles::update_role(state.store.as_ref(), &id, input)?))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    roles::delete_role(state.store.as_ref(), &id)?;
    Ok(StatusCode::NO_CONTENT)
}
