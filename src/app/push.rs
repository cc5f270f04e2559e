use crate::adapters::WebPushSender;
use crate::auth::TokenClaims;
use crate::error::AppError;
use crate::push::{self as push_service, AdHocMessage, DispatchReport, SubscribeRequest, SweepReport};
use crate::state::AppState;
use crate::types::push::Subscription;

use axum::Extension;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn public_key(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, AppError> {
    let sender = sender(&state)?;
    Ok(Json(PublicKeyResponse {
        public_key: sender.public_key().to_string(),
    }))
}

pub(crate) async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let subscription = push_service::subscribe(state.store.as_ref(), &claims.user_id, request)?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub(crate) async fn notify_me_tomorrow(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Result<Json<DispatchReport>, AppError> {
    notify_tomorrow(&state, &claims.user_id).await
}

pub(crate) async fn notify_user_tomorrow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DispatchReport>, AppError> {
    notify_tomorrow(&state, &id).await
}

async fn notify_tomorrow(state: &AppState, user_id: &str) -> Result<Json<DispatchReport>, AppError> {
    let intents = push_service::plan_user_tomorrow(
        state.store.as_ref(),
        user_id,
        OffsetDateTime::now_utc(),
        &state.sweep,
    )?;
    let report = push_service::deliver(sender(state)?, intents, &state.sweep).await;
    Ok(Json(report))
}

pub(crate) async fn notify_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(message): Json<AdHocMessage>,
) -> Result<Json<DispatchReport>, AppError> {
    let intents = push_service::plan_user_message(state.store.as_ref(), &id, &message)?;
    let report = push_service::deliver(sender(&state)?, intents, &state.sweep).await;
    tracing::info!(user_id = %id, delivered = report.delivered, "sent targeted notification");
    Ok(Json(report))
}

pub(crate) async fn broadcast(
    State(state): State<AppState>,
    Json(message): Json<AdHocMessage>,
) -> Result<Json<DispatchReport>, AppError> {
    let intents = push_service::plan_broadcast(state.store.as_ref(), &message)?;
    let report = push_service::deliver(sender(&state)?, intents, &state.sweep).await;
    tracing::info!(
        attempted = report.attempted,
        delivered = report.delivered,
        failed = report.failed,
        "sent broadcast notification"
    );
    Ok(Json(report))
}

pub(crate) async fn sweep_now(
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, AppError> {
    let sender = sender(&state)?;
    let report = push_service::run_sweep(
        state.store.as_ref(),
        sender,
        OffsetDateTime::now_utc(),
        &state.sweep,
    )
    .await?;
    tracing::info!(
        schedules = report.schedules,
        delivered = report.dispatch.delivered,
        failed = report.dispatch.failed,
        "manual notification sweep finished"
    );
    Ok(Json(report))
}

fn sender(state: &AppState) -> Result<&WebPushSender, AppError> {
    state.push.as_ref().ok_or(AppError::PushUnavailable)
}
