use crate::auth::AuthState;
use crate::error::AppError;
use crate::password;
use crate::ports::store::DocumentStore;
use crate::roles;
use crate::types::user::{NewUser, ProfileUpdate, User, UserView};

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserView,
}

/// Whether the caller may pick the new user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChoice {
    SelfService,
    Administrator,
}

/// Authenticates and signs a token carrying the role's permissions as of now.
///
/// Unknown email and wrong password both yield `InvalidCredentials`, after the same
/// amount of hashing work.
pub fn login(
    store: &dyn DocumentStore,
    auth: &AuthState,
    email: &str,
    password: &str,
) -> Result<LoginOutcome, AppError> {
    let Some(user) = store.find_user_by_email(email.trim())? else {
        password::verify_against_dummy(password);
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify_password(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let permissions = roles::resolve_permissions(store, &user.role_id)?;
    let token = auth
        .issue_token(&user.id, &permissions)
        .map_err(|err| AppError::Internal(format!("failed to issue token: {err}")))?;
    tracing::info!(user_id = %user.id, permissions = permissions.len(), "user logged in");

    Ok(LoginOutcome {
        token,
        user: UserView::from(&user),
    })
}

/// Creates a user. The first user of an empty store becomes an administrator;
/// otherwise the default role applies unless an administrator designates one.
pub fn register(
    store: &dyn DocumentStore,
    profile: NewUser,
    choice: RoleChoice,
    now: OffsetDateTime,
) -> Result<UserView, AppError> {
    let email = validate_email(&profile.email)?;
    if profile.password.is_empty() {
        return Err(AppError::InvalidRequest("password is required".to_string()));
    }
    if store.find_user_by_email(&email)?.is_some() {
        return Err(AppError::DuplicateUser);
    }

    let role_id = match (choice, profile.role_id.as_deref()) {
        (RoleChoice::Administrator, Some(role_id)) if !role_id.trim().is_empty() => {
            existing_role_id(store, role_id)?
        }
        _ => roles::resolve_default_role(store)?.id,
    };

    let password_hash = password::hash_password(&profile.password)?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        password_hash,
        first_name: profile.first_name.trim().to_string(),
        last_name: profile.last_name.trim().to_string(),
        location: profile.location.trim().to_string(),
        role_id,
        created_at: now,
        updated_at: now,
    };
    // The store swaps in the administrator role when this is its first user.
    let user = store.insert_user_or_first_admin(user, roles::admin_role_candidate())?;
    tracing::info!(user_id = %user.id, role_id = %user.role_id, "registered user");
    Ok(UserView::from(&user))
}

pub fn find_user(store: &dyn DocumentStore, id: &str) -> Result<UserView, AppError> {
    let user = store.find_user(id)?.ok_or(AppError::NotFound("User"))?;
    Ok(UserView::from(&user))
}

pub fn list_users(store: &dyn DocumentStore) -> Result<Vec<UserView>, AppError> {
    Ok(store.list_users()?.iter().map(UserView::from).collect())
}

pub fn update_profile(
    store: &dyn DocumentStore,
    id: &str,
    update: ProfileUpdate,
    choice: RoleChoice,
    now: OffsetDateTime,
) -> Result<UserView, AppError> {
    let mut user = store.find_user(id)?.ok_or(AppError::NotFound("User"))?;
    user.email = validate_email(&update.email)?;
    user.first_name = update.first_name.trim().to_string();
    user.last_name = update.last_name.trim().to_string();
    user.location = update.location.trim().to_string();
    if choice == RoleChoice::Administrator
        && let Some(role_id) = update.role_id.as_deref()
        && !role_id.trim().is_empty()
    {
        user.role_id = existing_role_id(store, role_id)?;
    }
    user.updated_at = now;

    if !store.update_user(user.clone())? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = %user.id, "updated user profile");
    Ok(UserView::from(&user))
}

/// Requires proof of the current password; a mismatch is `InvalidCredentials`.
pub fn change_password(
    store: &dyn DocumentStore,
    id: &str,
    current_password: &str,
    new_password: &str,
    now: OffsetDateTime,
) -> Result<UserView, AppError> {
    let mut user = store.find_user(id)?.ok_or(AppError::NotFound("User"))?;
    if !password::verify_password(current_password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }
    if new_password.is_empty() {
        return Err(AppError::InvalidRequest("new password is required".to_string()));
    }
    user.password_hash = password::hash_password(new_password)?;
    user.updated_at = now;
    if !store.update_user(user.clone())? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = %user.id, "changed password");
    Ok(UserView::from(&user))
}

pub fn delete_user(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    if !store.delete_user(id)? {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = %id, "deleted user");
    Ok(())
}

/// Seeds the configured administrator into an empty store.
pub fn bootstrap_admin(
    store: &dyn DocumentStore,
    email: &str,
    password: &str,
    now: OffsetDateTime,
) -> Result<Option<UserView>, AppError> {
    if store.count_users()? > 0 {
        return Ok(None);
    }
    let profile = NewUser {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Admin".to_string(),
        last_name: String::new(),
        location: String::new(),
        role_id: None,
    };
    register(store, profile, RoleChoice::Administrator, now).map(Some)
}

fn existing_role_id(store: &dyn DocumentStore, role_id: &str) -> Result<String, AppError> {
    let role = store
        .find_role(role_id.trim())?
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown role {role_id}")))?;
    Ok(role.id)
}

fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(AppError::InvalidRequest("a valid email is required".to_string())),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::permissions::{self, Permission};
    use crate::roles::{RoleInput, create_role, update_role};
    use crate::store::MemoryStore;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-01-12 09:30 UTC);

    fn new_user(email: &str, password: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Novak".to_string(),
            location: "Maribor".to_string(),
            role_id: None,
        }
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        register(
            &store,
            new_user("admin@example.com", "admin-pass"),
            RoleChoice::SelfService,
            NOW,
        )
        .expect("seed admin");
        store
    }

    #[test]
    fn register__should_make_first_user_administrator() {
        // Given
        let store = MemoryStore::new();

        // When
        let user = register(
            &store,
            new_user("first@example.com", "secret"),
            RoleChoice::SelfService,
            NOW,
        )
        .expect("register");

        // Then
        let role = store.find_role(&user.role_id).expect("query").expect("role");
        assert_eq!(role.name, roles::ADMIN_ROLE_NAME);
        assert_eq!(role.permissions, permissions::all_codes());
    }

    #[test]
    fn register__should_assign_default_role_and_ignore_self_chosen_role() {
        // Given
        let store = seeded_store();
        let admin = store
            .find_user_by_email("admin@example.com")
            .expect("query")
            .expect("admin");
        let mut profile = new_user("ana@example.com", "secret");
        profile.role_id = Some(admin.role_id.clone());

        // When
        let user = register(&store, profile, RoleChoice::SelfService, NOW).expect("register");

        // Then
        let role = store.find_role(&user.role_id).expect("query").expect("role");
        assert!(role.is_default);
        assert!(role.permissions.is_empty());
    }

    #[test]
    fn register__should_honour_role_chosen_by_administrator() {
        // Given
        let store = seeded_store();
        let role = create_role(
            &store,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [Permission::WriteSchedules.code()].into_iter().collect(),
            },
        )
        .expect("role");
        let mut profile = new_user("ana@example.com", "secret");
        profile.role_id = Some(role.id.clone());

        // When
        let user = register(&store, profile, RoleChoice::Administrator, NOW).expect("register");

        // Then
        assert_eq!(user.role_id, role.id);
    }

    #[test]
    fn register__should_fail_for_existing_email_regardless_of_other_fields() {
        // Given
        let store = seeded_store();
        let mut profile = new_user("admin@example.com", "different");
        profile.first_name = "Someone".to_string();
        profile.location = "Ptuj".to_string();

        // When
        let result = register(&store, profile, RoleChoice::SelfService, NOW);

        // Then
        assert!(matches!(result, Err(AppError::DuplicateUser)));
    }

    #[test]
    fn register__should_never_store_plaintext() {
        // Given
        let store = seeded_store();

        // When
        let user = register(
            &store,
            new_user("ana@example.com", "plain-secret"),
            RoleChoice::SelfService,
            NOW,
        )
        .expect("register");

        // Then
        let stored = store.find_user(&user.id).expect("query").expect("user");
        assert_ne!(stored.password_hash, "plain-secret");
        assert!(password::verify_password("plain-secret", &stored.password_hash));
    }

    #[test]
    fn login__should_fail_identically_for_unknown_email_and_wrong_password() {
        // Given
        let store = seeded_store();
        let auth = AuthState::from_key_bytes(b"login-secret");

        // When
        let unknown = login(&store, &auth, "nobody@example.com", "admin-pass")
            .expect_err("unknown email");
        let wrong = login(&store, &auth, "admin@example.com", "wrong").expect_err("wrong password");

        // Then
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.status(), wrong.status());
    }

    #[test]
    fn login__should_embed_role_permissions_at_issue_time() {
        // Given
        let store = seeded_store();
        let auth = AuthState::from_key_bytes(b"snapshot-secret");
        let role = create_role(
            &store,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [Permission::WriteSchedules.code()].into_iter().collect(),
            },
        )
        .expect("role");
        let mut profile = new_user("ana@example.com", "secret");
        profile.role_id = Some(role.id.clone());
        register(&store, profile, RoleChoice::Administrator, NOW).expect("register");
        let outcome = login(&store, &auth, "ana@example.com", "secret").expect("login");

        // When
        update_role(
            &store,
            &role.id,
            RoleInput {
                name: "scheduler".to_string(),
                permissions: [
                    Permission::WriteSchedules.code(),
                    Permission::DeleteSchedules.code(),
                ]
                .into_iter()
                .collect(),
            },
        )
        .expect("update role");

        // Then
        let claims = auth.verify_token(&outcome.token).expect("verify");
        assert_eq!(claims.permissions, vec![Permission::WriteSchedules.code()]);
        let fresh = login(&store, &auth, "ana@example.com", "secret").expect("login again");
        let fresh_claims = auth.verify_token(&fresh.token).expect("verify");
        assert_eq!(
            fresh_claims.permissions,
            vec![
                Permission::WriteSchedules.code(),
                Permission::DeleteSchedules.code()
            ]
        );
    }

    #[test]
    fn login__should_issue_empty_permissions_for_dangling_role() {
        // Given
        let store = seeded_store();
        let auth = AuthState::from_key_bytes(b"dangling-secret");
        let user = register(
            &store,
            new_user("ana@example.com", "secret"),
            RoleChoice::SelfService,
            NOW,
        )
        .expect("register");
        store.delete_role(&user.role_id).expect("delete role");

        // When
        let outcome = login(&store, &auth, "ana@example.com", "secret").expect("login");

        // Then
        let claims = auth.verify_token(&outcome.token).expect("verify");
        assert_eq!(claims.user_id, user.id);
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn change_password__should_require_current_password() {
        // Given
        let store = seeded_store();
        let admin = store
            .find_user_by_email("admin@example.com")
            .expect("query")
            .expect("admin");

        // When
        let rejected = change_password(&store, &admin.id, "wrong", "new-pass", NOW);
        change_password(&store, &admin.id, "admin-pass", "new-pass", NOW).expect("change");

        // Then
        assert!(matches!(rejected, Err(AppError::InvalidCredentials)));
        let stored = store.find_user(&admin.id).expect("query").expect("user");
        assert!(password::verify_password("new-pass", &stored.password_hash));
    }

    #[test]
    fn update_profile__should_keep_role_for_self_service() {
        // Given
        let store = seeded_store();
        let user = register(
            &store,
            new_user("ana@example.com", "secret"),
            RoleChoice::SelfService,
            NOW,
        )
        .expect("register");
        let admin_role = roles::resolve_admin_role(&store).expect("admin role");

        // When
        let updated = update_profile(
            &store,
            &user.id,
            ProfileUpdate {
                email: "ana@example.com".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Kovač".to_string(),
                location: "Ptuj".to_string(),
                role_id: Some(admin_role.id),
            },
            RoleChoice::SelfService,
            NOW,
        )
        .expect("update");

        // Then
        assert_eq!(updated.location, "Ptuj");
        assert_eq!(updated.role_id, user.role_id);
    }

    #[test]
    fn bootstrap_admin__should_only_seed_empty_store() {
        // Given
        let store = MemoryStore::new();

        // When
        let first = bootstrap_admin(&store, "root@example.com", "root-pass", NOW).expect("seed");
        let second = bootstrap_admin(&store, "other@example.com", "pass", NOW).expect("noop");

        // Then
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.count_users().expect("count"), 1);
    }

    #[test]
    fn register__should_grant_administrator_to_one_of_concurrent_first_users() {
        // Given
        let store = std::sync::Arc::new(MemoryStore::new());

        // When
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    register(
                        store.as_ref(),
                        new_user(&format!("user{n}@example.com"), "secret"),
                        RoleChoice::SelfService,
                        NOW,
                    )
                    .expect("register")
                })
            })
            .collect();
        let users: Vec<UserView> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();

        // Then
        let admin_roles: Vec<_> = store
            .list_roles()
            .expect("roles")
            .into_iter()
            .filter(|role| role.name == roles::ADMIN_ROLE_NAME)
            .collect();
        assert_eq!(admin_roles.len(), 1);
        let admins = users
            .iter()
            .filter(|user| user.role_id == admin_roles[0].id)
            .count();
        assert_eq!(admins, 1);
    }
}
