use crate::error::AppError;
use crate::schedules;
use crate::state::AppState;
use crate::types::schedule::{Frequency, GarbageType, Schedule, ScheduleFilter, ScheduleInput};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScheduleQuery {
    location: Option<String>,
    garbage_type: Option<GarbageType>,
    frequency: Option<Frequency>,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let filter = ScheduleFilter {
        location: query.location,
        garbage_type: query.garbage_type,
        frequency: query.frequency,
    };
    Ok(Json(schedules::list(state.store.as_ref(), &filter)?))
}

pub(crate) async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(schedules::find(state.store.as_ref(), &id)?))
}

pub(crate) async fn by_location(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let filter = ScheduleFilter {
        location: Some(location),
        ..ScheduleFilter::default()
    };
    Ok(Json(schedules::list(state.store.as_ref(), &filter)?))
}

pub(crate) async fn by_garbage_type(
    State(state): State<AppState>,
    Path(garbage_type): Path<String>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let filter = ScheduleFilter {
        garbage_type: Some(schedules::parse_garbage_type(&garbage_type)?),
        ..ScheduleFilter::default()
    };
    Ok(Json(schedules::list(state.store.as_ref(), &filter)?))
}

pub(crate) async fn by_frequency(
    State(state): State<AppState>,
    Path(frequency): Path<String>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let filter = ScheduleFilter {
        frequency: Some(schedules::parse_frequency(&frequency)?),
        ..ScheduleFilter::default()
    };
    Ok(Json(schedules::list(state.store.as_ref(), &filter)?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Json(input): Json<ScheduleInput>,
) -> Result<(StatusCode, Json<Schedule>), AppError> {
    let schedule = schedules::create(state.store.as_ref(), input, OffsetDateTime::now_utc())?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ScheduleInput>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(schedules::update(state.store.as_ref(), &id, input)?))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Schedule>, AppError> {
    Ok(Json(schedules::delete(state.store.as_ref(), &id)?))
}

#[derive(Debug, Serialize)]
pub(crate) struct DeletedResponse {
    deleted: usize,
}

pub(crate) async fn delete_all(
    State(state): State<AppState>,
) -> Result<Json<DeletedResponse>, AppError> {
    let deleted = schedules::delete_all(state.store.as_ref())?;
    Ok(Json(DeletedResponse { deleted }))
}

pub(crate) async fn replace_all(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<ScheduleInput>>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let replaced = schedules::replace_all(state.store.as_ref(), inputs, OffsetDateTime::now_utc())?;
    Ok(Json(replaced))
}
