use time::OffsetDateTime;

use crate::error::StoreResult;
use crate::types::push::Subscription;
use crate::types::role::Role;
use crate::types::schedule::{Schedule, ScheduleFilter};
use crate::types::user::User;

/// Narrow view of the document database used by the services.
///
/// Updates are whole-record replacements keyed by id and return `false` when the record
/// does not exist. Deletes report whether anything was removed.
pub trait DocumentStore: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is taken.
    fn insert_user(&self, user: User) -> StoreResult<()>;
    /// Inserts `user`, unless the email is taken. When the store holds no user yet, the
    /// user gets the role named like `admin` instead, inserting `admin` if no such role
    /// exists. The check and the insert happen under one write lock.
    fn insert_user_or_first_admin(&self, user: User, admin: Role) -> StoreResult<User>;
    fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn find_users_by_location(&self, location: &str) -> StoreResult<Vec<User>>;
    fn list_users(&self) -> StoreResult<Vec<User>>;
    fn count_users(&self) -> StoreResult<usize>;
    /// Fails with `DuplicateEmail` when the new email belongs to another user.
    fn update_user(&self, user: User) -> StoreResult<bool>;
    /// Also removes the user's push subscriptions.
    fn delete_user(&self, id: &str) -> StoreResult<bool>;

    fn insert_role(&self, role: Role) -> StoreResult<()>;
    fn find_role(&self, id: &str) -> StoreResult<Option<Role>>;
    fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    fn list_roles(&self) -> StoreResult<Vec<Role>>;
    fn update_role(&self, role: Role) -> StoreResult<bool>;
    fn delete_role(&self, id: &str) -> StoreResult<bool>;
    /// Returns the role marked default, inserting `candidate` first when none is. Runs
    /// under one write lock so concurrent callers observe a single default role.
    fn find_or_insert_default_role(&self, candidate: Role) -> StoreResult<Role>;
    /// Returns the role named like `candidate`, inserting `candidate` when none is.
    fn find_or_insert_role_by_name(&self, candidate: Role) -> StoreResult<Role>;

    fn insert_schedule(&self, schedule: Schedule) -> StoreResult<()>;
    fn find_schedule(&self, id: &str) -> StoreResult<Option<Schedule>>;
    fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>>;
    /// Schedules with `start <= date < end`.
    fn schedules_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> StoreResult<Vec<Schedule>>;
    fn update_schedule(&self, schedule: Schedule) -> StoreResult<bool>;
    fn delete_schedule(&self, id: &str) -> StoreResult<Option<Schedule>>;
    fn delete_all_schedules(&self) -> StoreResult<usize>;
    fn replace_schedules(&self, schedules: Vec<Schedule>) -> StoreResult<()>;

    /// Replaces any subscription already registered for the same endpoint.
    fn insert_subscription(&self, subscription: Subscription) -> StoreResult<()>;
    fn list_subscriptions(&self) -> StoreResult<Vec<Subscription>>;
    fn subscriptions_for_users(&self, user_ids: &[String]) -> StoreResult<Vec<Subscription>>;
}
