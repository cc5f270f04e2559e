use crate::error::{StoreError, StoreResult};
use crate::ports::store::DocumentStore;
use crate::types::push::Subscription;
use crate::types::role::Role;
use crate::types::schedule::{Schedule, ScheduleFilter};
use crate::types::user::User;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const SNAPSHOT_FILE: &str = "binday-store.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    schedules: Vec<Schedule>,
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

/// Document store kept in memory. With a snapshot path every mutation rewrites the
/// JSON snapshot before the write lock is released, and a failed rewrite leaves the
/// collections untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or starts) the snapshot in `data_dir`.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(SNAPSHOT_FILE);
        let collections = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Collections::default(),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            path = %path.display(),
            users = collections.users.len(),
            schedules = collections.schedules.len(),
            "opened document store"
        );
        Ok(Self {
            collections: RwLock::new(collections),
            snapshot: Some(path),
        })
    }

    fn read<R>(&self, f: impl FnOnce(&Collections) -> R) -> R {
        let guard = self.collections.read().expect("store lock");
        f(&*guard)
    }

    /// Applies `f` to a copy and swaps it in only once the snapshot holds it.
    fn write<R>(&self, f: impl FnOnce(&mut Collections) -> StoreResult<R>) -> StoreResult<R> {
        let mut guard = self.collections.write().expect("store lock");
        let Some(path) = self.snapshot.as_ref() else {
            return f(&mut *guard);
        };
        let mut next = guard.clone();
        let result = f(&mut next)?;
        let contents = serde_json::to_string_pretty(&next)?;
        atomic_write(path, &contents)?;
        *guard = next;
        Ok(result)
    }
}

impl DocumentStore for MemoryStore {
    fn insert_user(&self, user: User) -> StoreResult<()> {
        self.write(|c| {
            if c.users.iter().any(|existing| existing.email == user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            c.users.push(user);
            Ok(())
        })
    }

    fn insert_user_or_first_admin(&self, mut user: User, admin: Role) -> StoreResult<User> {
        self.write(|c| {
            if c.users.iter().any(|existing| existing.email == user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            if c.users.is_empty() {
                user.role_id = find_or_push_role(&mut c.roles, admin).id;
            }
            c.users.push(user.clone());
            Ok(user)
        })
    }

    fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.read(|c| c.users.iter().find(|user| user.id == id).cloned()))
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.read(|c| c.users.iter().find(|user| user.email == email).cloned()))
    }

    fn find_users_by_location(&self, location: &str) -> StoreResult<Vec<User>> {
        Ok(self.read(|c| {
            c.users
                .iter()
                .filter(|user| user.location == location)
                .cloned()
                .collect()
        }))
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.read(|c| c.users.clone()))
    }

    fn count_users(&self) -> StoreResult<usize> {
        Ok(self.read(|c| c.users.len()))
    }

    fn update_user(&self, user: User) -> StoreResult<bool> {
        self.write(|c| {
            if c
                .users
                .iter()
                .any(|existing| existing.email == user.email && existing.id != user.id)
            {
                return Err(StoreError::DuplicateEmail);
            }
            match c.users.iter_mut().find(|existing| existing.id == user.id) {
                Some(existing) => {
                    *existing = user;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_user(&self, id: &str) -> StoreResult<bool> {
        self.write(|c| {
            let before = c.users.len();
            c.users.retain(|user| user.id != id);
            if c.users.len() == before {
                return Ok(false);
            }
            c.subscriptions.retain(|subscription| subscription.user_id != id);
            Ok(true)
        })
    }

    fn insert_role(&self, role: Role) -> StoreResult<()> {
        self.write(|c| {
            c.roles.push(role);
            Ok(())
        })
    }

    fn find_role(&self, id: &str) -> StoreResult<Option<Role>> {
        Ok(self.read(|c| c.roles.iter().find(|role| role.id == id).cloned()))
    }

    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        Ok(self.read(|c| c.roles.iter().find(|role| role.name == name).cloned()))
    }

    fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.read(|c| c.roles.clone()))
    }

    fn update_role(&self, role: Role) -> StoreResult<bool> {
        self.write(|c| match c.roles.iter_mut().find(|existing| existing.id == role.id) {
            Some(existing) => {
                *existing = role;
                Ok(true)
            }
            None => Ok(false),
        })
    }

    fn delete_role(&self, id: &str) -> StoreResult<bool> {
        self.write(|c| {
            let before = c.roles.len();
            c.roles.retain(|role| role.id != id);
            Ok(c.roles.len() != before)
        })
    }

    fn find_or_insert_default_role(&self, candidate: Role) -> StoreResult<Role> {
        if let Some(role) = self.read(|c| c.roles.iter().find(|role| role.is_default).cloned()) {
            return Ok(role);
        }
        self.write(|c| {
            if let Some(role) = c.roles.iter().find(|role| role.is_default) {
                return Ok(role.clone());
            }
            let role = Role {
                is_default: true,
                ..candidate
            };
            c.roles.push(role.clone());
            Ok(role)
        })
    }

    fn find_or_insert_role_by_name(&self, candidate: Role) -> StoreResult<Role> {
        let existing = self.read(|c| {
            c.roles
                .iter()
                .find(|role| role.name == candidate.name)
                .cloned()
        });
        if let Some(role) = existing {
            return Ok(role);
        }
        self.write(|c| Ok(find_or_push_role(&mut c.roles, candidate)))
    }

    fn insert_schedule(&self, schedule: Schedule) -> StoreResult<()> {
        self.write(|c| {
            c.schedules.push(schedule);
            Ok(())
        })
    }

    fn find_schedule(&self, id: &str) -> StoreResult<Option<Schedule>> {
        Ok(self.read(|c| c.schedules.iter().find(|schedule| schedule.id == id).cloned()))
    }

    fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
        Ok(self.read(|c| {
            c.schedules
                .iter()
                .filter(|schedule| filter.matches(schedule))
                .cloned()
                .collect()
        }))
    }

    fn schedules_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> StoreResult<Vec<Schedule>> {
        Ok(self.read(|c| {
            c.schedules
                .iter()
                .filter(|schedule| schedule.date >= start && schedule.date < end)
                .cloned()
                .collect()
        }))
    }

    fn update_schedule(&self, schedule: Schedule) -> StoreResult<bool> {
        self.write(|c| {
            match c
                .schedules
                .iter_mut()
                .find(|existing| existing.id == schedule.id)
            {
                Some(existing) => {
                    *existing = schedule;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    fn delete_schedule(&self, id: &str) -> StoreResult<Option<Schedule>> {
        self.write(|c| {
            let position = c.schedules.iter().position(|schedule| schedule.id == id);
            Ok(position.map(|index| c.schedules.remove(index)))
        })
    }

    fn delete_all_schedules(&self) -> StoreResult<usize> {
        self.write(|c| {
            let removed = c.schedules.len();
            c.schedules.clear();
            Ok(removed)
        })
    }

    fn replace_schedules(&self, schedules: Vec<Schedule>) -> StoreResult<()> {
        self.write(|c| {
            c.schedules = schedules;
            Ok(())
        })
    }

    fn insert_subscription(&self, subscription: Subscription) -> StoreResult<()> {
        self.write(|c| {
            c.subscriptions
                .retain(|existing| existing.endpoint != subscription.endpoint);
            c.subscriptions.push(subscription);
            Ok(())
        })
    }

    fn list_subscriptions(&self) -> StoreResult<Vec<Subscription>> {
        Ok(self.read(|c| c.subscriptions.clone()))
    }

    fn subscriptions_for_users(&self, user_ids: &[String]) -> StoreResult<Vec<Subscription>> {
        Ok(self.read(|c| {
            c.subscriptions
                .iter()
                .filter(|subscription| user_ids.contains(&subscription.user_id))
                .cloned()
                .collect()
        }))
    }
}

fn find_or_push_role(roles: &mut Vec<Role>, candidate: Role) -> Role {
    if let Some(role) = roles.iter().find(|role| role.name == candidate.name) {
        return role.clone();
    }
    roles.push(candidate.clone());
    candidate
}

fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("missing parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(SNAPSHOT_FILE);
    let pid = std::process::id();

    for attempt in 0..10u32 {
        let temp_path = parent.join(format!(".{file_name}.tmp-{pid}-{attempt}"));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                file.sync_all()?;
                std::fs::rename(&temp_path, path)?;
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to create snapshot temp file",
    ))
}
