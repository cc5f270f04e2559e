use crate::error::AppError;
use crate::ports::store::DocumentStore;
use crate::types::schedule::{Frequency, GarbageType, Schedule, ScheduleFilter, ScheduleInput};

use time::OffsetDateTime;

pub fn list(store: &dyn DocumentStore, filter: &ScheduleFilter) -> Result<Vec<Schedule>, AppError> {
    let mut schedules = store.list_schedules(filter)?;
    schedules.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    Ok(schedules)
}

pub fn find(store: &dyn DocumentStore, id: &str) -> Result<Schedule, AppError> {
    store.find_schedule(id)?.ok_or(AppError::NotFound("Schedule"))
}

pub fn parse_garbage_type(raw: &str) -> Result<GarbageType, AppError> {
    GarbageType::parse(raw)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown garbage type '{raw}'")))
}

pub fn parse_frequency(raw: &str) -> Result<Frequency, AppError> {
    Frequency::parse(raw)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown frequency '{raw}'")))
}

pub fn create(
    store: &dyn DocumentStore,
    input: ScheduleInput,
    now: OffsetDateTime,
) -> Result<Schedule, AppError> {
    let schedule = validate(input)?.into_schedule(uuid::Uuid::new_v4().to_string(), now);
    store.insert_schedule(schedule.clone())?;
    tracing::info!(
        schedule_id = %schedule.id,
        location = %schedule.location,
        date = %schedule.date,
        "created schedule"
    );
    Ok(schedule)
}

/// Replaces the editable fields; `date_added` is kept.
pub fn update(
    store: &dyn DocumentStore,
    id: &str,
    input: ScheduleInput,
) -> Result<Schedule, AppError> {
    let existing = find(store, id)?;
    let schedule = validate(input)?.into_schedule(existing.id, existing.date_added);
    if !store.update_schedule(schedule.clone())? {
        return Err(AppError::NotFound("Schedule"));
    }
    tracing::info!(schedule_id = %schedule.id, "updated schedule");
    Ok(schedule)
}

pub fn delete(store: &dyn DocumentStore, id: &str) -> Result<Schedule, AppError> {
    let removed = store
        .delete_schedule(id)?
        .ok_or(AppError::NotFound("Schedule"))?;
    tracing::info!(schedule_id = %removed.id, "deleted schedule");
    Ok(removed)
}

pub fn delete_all(store: &dyn DocumentStore) -> Result<usize, AppError> {
    let removed = store.delete_all_schedules()?;
    tracing::info!(removed, "deleted all schedules");
    Ok(removed)
}

/// Swaps the whole collection. Nothing changes when any entry is invalid.
pub fn replace_all(
    store: &dyn DocumentStore,
    inputs: Vec<ScheduleInput>,
    now: OffsetDateTime,
) -> Result<Vec<Schedule>, AppError> {
    let schedules = inputs
        .into_iter()
        .map(|input| {
            validate(input)
                .map(|input| input.into_schedule(uuid::Uuid::new_v4().to_string(), now))
        })
        .collect::<Result<Vec<_>, _>>()?;
    store.replace_schedules(schedules.clone())?;
    tracing::info!(count = schedules.len(), "replaced all schedules");
    Ok(schedules)
}

fn validate(mut input: ScheduleInput) -> Result<ScheduleInput, AppError> {
    input.location = input.location.trim().to_string();
    if input.location.is_empty() {
        return Err(AppError::InvalidRequest("location is required".to_string()));
    }
    input.footnote = input.footnote.trim().to_string();
    Ok(input)
}
