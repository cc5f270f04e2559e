use crate::config::SweepConfig;
use crate::ports;
use crate::ports::store::DocumentStore;
use crate::push::run_sweep;

use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, Time, UtcOffset};
use tokio::task::JoinHandle;

/// Fires the notification sweep once a day at a fixed wall-clock time.
pub(crate) struct DailySweepScheduler<T, S> {
    time: T,
    sender: S,
    store: Arc<dyn DocumentStore>,
    settings: SweepConfig,
}

impl<T, S> DailySweepScheduler<T, S>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
{
    pub(crate) fn new(
        time: T,
        sender: S,
        store: Arc<dyn DocumentStore>,
        settings: SweepConfig,
    ) -> Self {
        Self {
            time,
            sender,
            store,
            settings,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let offset = self.settings.utc_offset;
        let mut not_before = self.time.now_at(offset);
        loop {
            let now = self.time.now_at(offset).max(not_before);
            let fire_at = next_run_after(now, self.settings.at, offset);
            tracing::info!(next_run = %fire_at, "notification sweep scheduled");
            if let Some(delay) = compute_delay(self.time.now(), fire_at) {
                self.time.sleep(delay).await;
            }

            match run_sweep(
                self.store.as_ref(),
                &self.sender,
                fire_at,
                &self.settings,
            )
            .await
            {
                Ok(report) => tracing::info!(
                    schedules = report.schedules,
                    attempted = report.dispatch.attempted,
                    delivered = report.dispatch.delivered,
                    failed = report.dispatch.failed,
                    "notification sweep finished"
                ),
                Err(err) => tracing::error!(error = %err, "notification sweep failed"),
            }
            not_before = fire_at;
        }
    }
}

/// First instant strictly after `now` whose wall-clock time at `offset` is `at`.
pub(crate) fn next_run_after(now: OffsetDateTime, at: Time, offset: UtcOffset) -> OffsetDateTime {
    let local = now.to_offset(offset);
    let candidate = local.replace_time(at);
    if candidate > local {
        candidate
    } else {
        candidate + time::Duration::days(1)
    }
}

fn compute_delay(now: OffsetDateTime, at: OffsetDateTime) -> Option<Duration> {
    let delay = at - now;
    if delay.is_positive() {
        match delay.try_into() {
            Ok(std_delay) => Some(std_delay),
            Err(_) => Some(Duration::MAX),
        }
    } else {
        None
    }
}
