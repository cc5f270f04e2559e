use serde::Serialize;
use std::collections::BTreeSet;

/// Capability codes carried in roles and tokens.
///
/// The numeric values are part of the wire contract: issued tokens and stored roles hold
/// the raw codes, so a value must never be reused for a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Permission {
    ReadUsers = 100,
    WriteUsers = 101,
    DeleteUsers = 102,

    WriteSchedules = 201,
    DeleteSchedules = 202,

    WriteCollectionPoints = 301,
    DeleteCollectionPoints = 302,

    ReadUserStatistics = 401,
    WriteUserStatistics = 402,
    DeleteUserStatistics = 403,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::ReadUsers,
        Permission::WriteUsers,
        Permission::DeleteUsers,
        Permission::WriteSchedules,
        Permission::DeleteSchedules,
        Permission::WriteCollectionPoints,
        Permission::DeleteCollectionPoints,
        Permission::ReadUserStatistics,
        Permission::WriteUserStatistics,
        Permission::DeleteUserStatistics,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|permission| permission.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Permission::ReadUsers => "READ_USERS",
            Permission::WriteUsers => "WRITE_USERS",
            Permission::DeleteUsers => "DELETE_USERS",
            Permission::WriteSchedules => "WRITE_SCHEDULES",
            Permission::DeleteSchedules => "DELETE_SCHEDULES",
            Permission::WriteCollectionPoints => "WRITE_COLLECTION_POINTS",
            Permission::DeleteCollectionPoints => "DELETE_COLLECTION_POINTS",
            Permission::ReadUserStatistics => "READ_USER_STATISTICS",
            Permission::WriteUserStatistics => "WRITE_USER_STATISTICS",
            Permission::DeleteUserStatistics => "DELETE_USER_STATISTICS",
        }
    }
}

pub fn all_codes() -> BTreeSet<u16> {
    Permission::ALL.into_iter().map(Permission::code).collect()
}

/// Conjunctive check: every required permission must be held. An empty requirement
/// always passes.
pub fn has_all(held: &[u16], required: &[Permission]) -> bool {
    required
        .iter()
        .all(|permission| held.contains(&permission.code()))
}

/// Returns the first code that does not name a known permission.
pub fn first_unknown(codes: &BTreeSet<u16>) -> Option<u16> {
    codes
        .iter()
        .copied()
        .find(|code| Permission::from_code(*code).is_none())
}

#[derive(Debug, Serialize)]
pub struct PermissionInfo {
    pub code: u16,
    pub name: &'static str,
}

pub fn catalogue() -> Vec<PermissionInfo> {
    Permission::ALL
        .into_iter()
        .map(|permission| PermissionInfo {
            code: permission.code(),
            name: permission.name(),
        })
        .collect()
}
