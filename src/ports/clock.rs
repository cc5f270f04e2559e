use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};

/// Clock and timer behind the daily sweep, swapped for a manual clock in tests.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;

    /// Current instant expressed at `offset`.
    fn now_at(&self, offset: UtcOffset) -> OffsetDateTime {
        self.now().to_offset(offset)
    }
}
