use crate::types::push::{NotificationPayload, Subscription};
use crate::types::schedule::Schedule;
use crate::types::user::User;

use std::collections::HashSet;
use time::{Duration, OffsetDateTime, UtcOffset};

pub(crate) const SWEEP_TITLE: &str = "Waste collection tomorrow";

/// Half-open calendar day `[start, end)` in the server's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DayWindow {
    pub(crate) start: OffsetDateTime,
    pub(crate) end: OffsetDateTime,
}

impl DayWindow {
    pub(crate) fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.start && at < self.end
    }
}

/// The calendar day after `now`, as seen at `offset`.
pub(crate) fn tomorrow_window(now: OffsetDateTime, offset: UtcOffset) -> DayWindow {
    let today = now.to_offset(offset).date();
    let tomorrow = today.next_day().unwrap_or(today);
    let start = tomorrow.midnight().assume_offset(offset);
    DayWindow {
        start,
        end: start + Duration::days(1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeliveryIntent {
    pub(crate) user_id: String,
    pub(crate) subscription: Subscription,
    pub(crate) payload: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SweepPlan {
    pub(crate) schedules: usize,
    pub(crate) intents: Vec<DeliveryIntent>,
}

pub(crate) fn tomorrow_payload(schedule: &Schedule) -> NotificationPayload {
    NotificationPayload::new(
        SWEEP_TITLE,
        format!(
            "Tomorrow is {} collection day at {}.",
            schedule.garbage_type.as_str(),
            schedule.location
        ),
    )
}

/// Matches schedules falling inside `window` against users at the same location
/// (exact, case-sensitive) and picks one subscription per user.
///
/// A user is notified at most once per plan: the first subscription seen wins and the
/// earliest matching schedule supplies the body. Users without subscriptions are skipped.
pub(crate) fn plan_sweep(
    window: &DayWindow,
    schedules: &[Schedule],
    users: &[User],
    subscriptions: &[Subscription],
) -> SweepPlan {
    let mut due: Vec<&Schedule> = schedules
        .iter()
        .filter(|schedule| window.contains(schedule.date))
        .collect();
    due.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let mut notified: HashSet<&str> = HashSet::new();
    let mut intents = Vec::new();
    for schedule in &due {
        let payload = tomorrow_payload(schedule).to_json();
        for user in users.iter().filter(|user| user.location == schedule.location) {
            if notified.contains(user.id.as_str()) {
                continue;
            }
            let Some(subscription) = subscriptions
                .iter()
                .find(|subscription| subscription.user_id == user.id)
            else {
                continue;
            };
            notified.insert(user.id.as_str());
            intents.push(DeliveryIntent {
                user_id: user.id.clone(),
                subscription: subscription.clone(),
                payload: payload.clone(),
            });
        }
    }

    SweepPlan {
        schedules: due.len(),
        intents,
    }
}
