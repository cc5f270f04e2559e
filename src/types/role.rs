use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Named bundle of permission codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: BTreeSet<u16>,
    pub is_default: bool,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: BTreeSet<u16>, is_default: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            permissions,
            is_default,
        }
    }
}
