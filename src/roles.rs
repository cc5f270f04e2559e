use crate::error::AppError;
use crate::permissions;
use crate::ports::store::DocumentStore;
use crate::types::role::Role;

use serde::Deserialize;
use std::collections::BTreeSet;

pub const DEFAULT_ROLE_NAME: &str = "user";
pub const ADMIN_ROLE_NAME: &str = "administrator";

#[derive(Debug, Clone, Deserialize)]
pub struct RoleInput {
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeSet<u16>,
}

/// The role given to self-registered users. Created with no permissions the first time
/// it is needed.
pub fn resolve_default_role(store: &dyn DocumentStore) -> Result<Role, AppError> {
    let candidate = Role::new(DEFAULT_ROLE_NAME, BTreeSet::new(), true);
    let role = store.find_or_insert_default_role(candidate)?;
    Ok(role)
}

/// Role holding every known permission code, created on demand.
pub fn resolve_admin_role(store: &dyn DocumentStore) -> Result<Role, AppError> {
    let role = store.find_or_insert_role_by_name(admin_role_candidate())?;
    Ok(role)
}

pub(crate) fn admin_role_candidate() -> Role {
    Role::new(ADMIN_ROLE_NAME, permissions::all_codes(), false)
}

/// Effective permissions of a role id. A dangling or unknown role id resolves to no
/// permissions; this is the single policy used wherever a role is looked up.
pub fn resolve_permissions(store: &dyn DocumentStore, role_id: &str) -> Result<Vec<u16>, AppError> {
    match store.find_role(role_id)? {
        Some(role) => Ok(role.permissions.into_iter().collect()),
        None => {
            tracing::warn!(%role_id, "role not found; treating as no permissions");
            Ok(Vec::new())
        }
    }
}

pub fn create_role(store: &dyn DocumentStore, input: RoleInput) -> Result<Role, AppError> {
    let name = validate(&input)?;
    if store.find_role_by_name(&name)?.is_some() {
        return Err(AppError::DuplicateRole);
    }
    let role = Role::new(name, input.permissions, false);
    store.insert_role(role.clone())?;
    tracing::info!(role_id = %role.id, name = %role.name, "created role");
    Ok(role)
}

/// Changes name and permissions. Tokens already issued keep their old snapshot.
pub fn update_role(store: &dyn DocumentStore, id: &str, input: RoleInput) -> Result<Role, AppError> {
    let name = validate(&input)?;
    let mut role = store.find_role(id)?.ok_or(AppError::NotFound("Role"))?;
    if let Some(existing) = store.find_role_by_name(&name)?
        && existing.id != role.id
    {
        return Err(AppError::DuplicateRole);
    }
    role.name = name;
    role.permissions = input.permissions;
    if !store.update_role(role.clone())? {
        return Err(AppError::NotFound("Role"));
    }
    tracing::info!(role_id = %role.id, "updated role");
    Ok(role)
}

pub fn delete_role(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    if !store.delete_role(id)? {
        return Err(AppError::NotFound("Role"));
    }
    tracing::info!(role_id = %id, "deleted role");
    Ok(())
}

fn validate(input: &RoleInput) -> Result<String, AppError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("role name is required".to_string()));
    }
    if let Some(code) = permissions::first_unknown(&input.permissions) {
        return Err(AppError::InvalidRequest(format!(
            "unknown permission code {code}"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::permissions::Permission;
    use crate::store::MemoryStore;

    #[test]
    fn resolve_default_role__should_create_empty_default_once() {
        // Given
        let store = MemoryStore::new();

        // When
        let first = resolve_default_role(&store).expect("first");
        let second = resolve_default_role(&store).expect("second");

        // Then
        assert!(first.is_default);
        assert!(first.permissions.is_empty());
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_roles().expect("roles").len(), 1);
    }

    #[test]
    fn resolve_admin_role__should_create_administrator_once() {
        // Given
        let store = MemoryStore::new();

        // When
        let first = resolve_admin_role(&store).expect("first");
        let second = resolve_admin_role(&store).expect("second");

        // Then
        assert_eq!(first.id, second.id);
        assert_eq!(first.permissions, permissions::all_codes());
        assert_eq!(store.list_roles().expect("roles").len(), 1);
    }

    #[test]
    fn resolve_default_role__should_return_existing_default() {
        // Given
        let store = MemoryStore::new();
        let existing = Role::new("citizen", [100].into_iter().collect(), true);
        store.insert_role(existing.clone()).expect("insert");

        // When
        let role = resolve_default_role(&store).expect("resolve");

        // Then
        assert_eq!(role, existing);
    }

    #[test]
    fn resolve_permissions__should_treat_missing_role_as_empty() {
        let store = MemoryStore::new();

        assert!(resolve_permissions(&store, "gone").expect("resolve").is_empty());
    }

    #[test]
    fn create_role__should_reject_unknown_codes_and_duplicates() {
        // Given
        let store = MemoryStore::new();
        create_role(
            &store,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [Permission::WriteSchedules.code()].into_iter().collect(),
            },
        )
        .expect("create");

        // When
        let duplicate = create_role(
            &store,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: BTreeSet::new(),
            },
        );
        let unknown = create_role(
            &store,
            RoleInput {
                name: "other".to_string(),
                permissions: [555].into_iter().collect(),
            },
        );

        // Then
        assert!(matches!(duplicate, Err(AppError::DuplicateRole)));
        assert!(matches!(unknown, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn update_role__should_replace_permissions() {
        // Given
        let store = MemoryStore::new();
        let role = create_role(
            &store,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [201].into_iter().collect(),
            },
        )
        .expect("create");

        // When
        let updated = update_role(
            &store,
            &role.id,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [201, 202].into_iter().collect(),
            },
        )
        .expect("update");

        // Then
        assert_eq!(updated.permissions.len(), 2);
        assert_eq!(
            resolve_permissions(&store, &role.id).expect("resolve"),
            vec![201, 202]
        );
    }
}
