use crate::permissions::{self, PermissionInfo};
use crate::types::schedule::{Frequency, GarbageType};

use axum::Json;

pub(crate) async fn garbage_types() -> Json<Vec<&'static str>> {
    Json(GarbageType::ALL.into_iter().map(GarbageType::as_str).collect())
}

pub(crate) async fn frequencies() -> Json<Vec<&'static str>> {
    Json(Frequency::ALL.into_iter().map(Frequency::as_str).collect())
}

pub(crate) async fn permissions() -> Json<Vec<PermissionInfo>> {
    Json(permissions::catalogue())
}
