use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config::{AppConfig, SweepConfig};
use crate::error::AppError;
use crate::ports::push::PushSender;
use crate::ports::store::DocumentStore;
use crate::types::push::{NotificationPayload, Subscription, SubscriptionKeys};

mod dispatch;
mod scheduler;
mod sweep;
pub(crate) mod vapid;

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::task::JoinHandle;

pub use dispatch::DispatchReport;
use scheduler::DailySweepScheduler;
use vapid::{VapidConfigStatus, load_vapid_config};
use sweep::DeliveryIntent;
pub use vapid::{VapidKeys, generate_vapid_keys};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub schedules: usize,
    #[serde(flatten)]
    pub dispatch: DispatchReport,
}

/// Builds the push sender when VAPID is fully configured.
pub fn sender_from_config(config: &AppConfig) -> Option<WebPushSender> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(keys) if vapid::is_valid_public_key(&keys.public_key) => keys,
        VapidConfigStatus::Ready(_) => {
            tracing::warn!("push notifications disabled: VAPID public key is malformed");
            return None;
        }
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            tracing::info!("push notifications disabled: no VAPID configuration");
            return None;
        }
    };

    match WebPushSender::new(vapid) {
        Ok(sender) => Some(sender),
        Err(err) => {
            tracing::error!(error = %err, "push notifications disabled: failed to init web-push");
            None
        }
    }
}

pub fn start_daily_sweep(
    sender: WebPushSender,
    store: Arc<dyn DocumentStore>,
    settings: SweepConfig,
) -> JoinHandle<()> {
    DailySweepScheduler::new(TokioTimeProvider, sender, store, settings).spawn()
}

/// Fetches tomorrow's schedules with their users and subscriptions and plans one
/// delivery per affected user.
pub(crate) fn plan_daily_sweep(
    store: &dyn DocumentStore,
    now: OffsetDateTime,
    settings: &SweepConfig,
) -> Result<sweep::SweepPlan, AppError> {
    let window = sweep::tomorrow_window(now, settings.utc_offset);
    let schedules = store.schedules_between(window.start, window.end)?;
    if schedules.is_empty() {
        return Ok(sweep::SweepPlan::default());
    }

    let mut locations: Vec<&str> = schedules
        .iter()
        .map(|schedule| schedule.location.as_str())
        .collect();
    locations.sort_unstable();
    locations.dedup();

    let mut users = Vec::new();
    for location in locations {
        users.extend(store.find_users_by_location(location)?);
    }
    let user_ids: Vec<String> = users.iter().map(|user| user.id.clone()).collect();
    let subscriptions = store.subscriptions_for_users(&user_ids)?;

    Ok(sweep::plan_sweep(&window, &schedules, &users, &subscriptions))
}

/// One sweep: an empty match set is a silent no-op and delivery failures only show up
/// in the report.
pub(crate) async fn run_sweep<S: PushSender>(
    store: &dyn DocumentStore,
    sender: &S,
    now: OffsetDateTime,
    settings: &SweepConfig,
) -> Result<SweepReport, AppError> {
    let plan = plan_daily_sweep(store, now, settings)?;
    if plan.intents.is_empty() {
        tracing::debug!(schedules = plan.schedules, "notification sweep found nobody to notify");
        return Ok(SweepReport {
            schedules: plan.schedules,
            dispatch: DispatchReport::default(),
        });
    }
    let dispatch = dispatch::dispatch_all(sender, plan.intents, settings.delivery_timeout).await;
    Ok(SweepReport {
        schedules: plan.schedules,
        dispatch,
    })
}

/// Tomorrow's reminder for a single user, restricted to their own location and
/// subscriptions.
pub(crate) fn plan_user_tomorrow(
    store: &dyn DocumentStore,
    user_id: &str,
    now: OffsetDateTime,
    settings: &SweepConfig,
) -> Result<Vec<DeliveryIntent>, AppError> {
    let user = store.find_user(user_id)?.ok_or(AppError::NotFound("User"))?;
    let subscriptions = store.subscriptions_for_users(std::slice::from_ref(&user.id))?;
    if subscriptions.is_empty() {
        return Err(AppError::NoSubscriptions);
    }

    let window = sweep::tomorrow_window(now, settings.utc_offset);
    let schedules: Vec<_> = store
        .schedules_between(window.start, window.end)?
        .into_iter()
        .filter(|schedule| schedule.location == user.location)
        .collect();
    let plan = sweep::plan_sweep(&window, &schedules, std::slice::from_ref(&user), &subscriptions);
    let Some(reminder) = plan.intents.into_iter().next() else {
        return Err(AppError::NoScheduleTomorrow);
    };
    // Unlike the sweep, a requested reminder reaches every device of the user.
    Ok(intents_for(subscriptions, &reminder.payload))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AdHocMessage {
    pub title: String,
    pub body: String,
}

impl AdHocMessage {
    fn payload(&self) -> Result<String, AppError> {
        let title = self.title.trim();
        let body = self.body.trim();
        if title.is_empty() || body.is_empty() {
            return Err(AppError::InvalidRequest(
                "title and body are required".to_string(),
            ));
        }
        Ok(NotificationPayload::new(title, body).to_json())
    }
}

/// Ad hoc message to every registered subscription, bypassing schedule matching.
pub(crate) fn plan_broadcast(
    store: &dyn DocumentStore,
    message: &AdHocMessage,
) -> Result<Vec<DeliveryIntent>, AppError> {
    let payload = message.payload()?;
    let subscriptions = store.list_subscriptions()?;
    if subscriptions.is_empty() {
        return Err(AppError::NoSubscriptions);
    }
    Ok(intents_for(subscriptions, &payload))
}

/// Ad hoc message to every subscription of one user.
pub(crate) fn plan_user_message(
    store: &dyn DocumentStore,
    user_id: &str,
    message: &AdHocMessage,
) -> Result<Vec<DeliveryIntent>, AppError> {
    let payload = message.payload()?;
    let user = store.find_user(user_id)?.ok_or(AppError::NotFound("User"))?;
    let subscriptions = store.subscriptions_for_users(std::slice::from_ref(&user.id))?;
    if subscriptions.is_empty() {
        return Err(AppError::NoSubscriptions);
    }
    Ok(intents_for(subscriptions, &payload))
}

pub(crate) async fn deliver<S: PushSender>(
    sender: &S,
    intents: Vec<DeliveryIntent>,
    settings: &SweepConfig,
) -> DispatchReport {
    dispatch::dispatch_all(sender, intents, settings.delivery_timeout).await
}

fn intents_for(
    subscriptions: Vec<Subscription>,
    payload: &str,
) -> Vec<DeliveryIntent> {
    subscriptions
        .into_iter()
        .map(|subscription| DeliveryIntent {
            user_id: subscription.user_id.clone(),
            subscription,
            payload: payload.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

/// Registers a push endpoint for `user_id`. Re-registering an endpoint moves it to the
/// caller.
pub(crate) fn subscribe(
    store: &dyn DocumentStore,
    user_id: &str,
    request: SubscribeRequest,
) -> Result<Subscription, AppError> {
    let endpoint = request.endpoint.trim();
    if !endpoint.starts_with("https://") {
        return Err(AppError::InvalidRequest(
            "endpoint must be an https URL".to_string(),
        ));
    }
    if request.keys.p256dh.trim().is_empty() || request.keys.auth.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "keys.p256dh and keys.auth are required".to_string(),
        ));
    }
    let subscription = Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        endpoint: endpoint.to_string(),
        keys: SubscriptionKeys {
            p256dh: request.keys.p256dh.trim().to_string(),
            auth: request.keys.auth.trim().to_string(),
        },
    };
    store.insert_subscription(subscription.clone())?;
    tracing::info!(user_id, subscription_id = %subscription.id, "registered push subscription");
    Ok(subscription)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::push::dispatch::tests::TestSender;
    use crate::push::sweep::tests::{NOW, schedule, subscription, user};
    use crate::store::MemoryStore;
    use crate::types::schedule::GarbageType;
    use time::macros::datetime;

    fn maribor_store(users: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for n in 1..=users {
            store
                .insert_user(user(&format!("u{n}"), "Maribor"))
                .expect("user");
            store
                .insert_subscription(subscription(&format!("s{n}"), &format!("u{n}")))
                .expect("subscription");
        }
        store
    }

    #[tokio::test]
    async fn run_sweep__should_deliver_once_per_user_at_location() {
        // Given
        let store = maribor_store(5);
        store
            .insert_schedule(schedule(
                "glass",
                "Maribor",
                GarbageType::Glass,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");
        let sender = TestSender::default();

        // When
        let report = run_sweep(&store, &sender, NOW, &SweepConfig::default())
            .await
            .expect("sweep");

        // Then
        assert_eq!(report.schedules, 1);
        assert_eq!(report.dispatch.attempted, 5);
        assert_eq!(report.dispatch.delivered, 5);
        assert_eq!(sender.sent().len(), 5);
    }

    #[tokio::test]
    async fn run_sweep__should_deliver_to_one_of_several_devices() {
        // Given
        let store = maribor_store(1);
        store
            .insert_subscription(subscription("s1-laptop", "u1"))
            .expect("subscription");
        store
            .insert_subscription(subscription("s1-tablet", "u1"))
            .expect("subscription");
        store
            .insert_schedule(schedule(
                "paper",
                "Maribor",
                GarbageType::Paper,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");
        let sender = TestSender::default();

        // When
        run_sweep(&store, &sender, NOW, &SweepConfig::default())
            .await
            .expect("sweep");

        // Then
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn run_sweep__should_skip_schedules_two_days_out() {
        // Given
        let store = maribor_store(3);
        store
            .insert_schedule(schedule(
                "glass",
                "Maribor",
                GarbageType::Glass,
                datetime!(2025-01-14 07:00 UTC),
            ))
            .expect("schedule");
        let sender = TestSender::default();

        // When
        let report = run_sweep(&store, &sender, NOW, &SweepConfig::default())
            .await
            .expect("sweep");

        // Then
        assert_eq!(report, SweepReport::default());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn run_sweep__should_finish_when_a_delivery_fails() {
        // Given
        let store = maribor_store(3);
        store
            .insert_schedule(schedule(
                "glass",
                "Maribor",
                GarbageType::Glass,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");
        let sender = TestSender {
            failing: Arc::new(vec!["https://push.example/s2".to_string()]),
            ..TestSender::default()
        };

        // When
        let report = run_sweep(&store, &sender, NOW, &SweepConfig::default())
            .await
            .expect("sweep");

        // Then
        assert_eq!(report.dispatch.delivered, 2);
        assert_eq!(report.dispatch.failed, 1);
    }

    #[tokio::test]
    async fn plan_user_tomorrow__should_fail_without_subscription() {
        // Given
        let store = MemoryStore::new();
        store.insert_user(user("u1", "Maribor")).expect("user");
        store
            .insert_schedule(schedule(
                "glass",
                "Maribor",
                GarbageType::Glass,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");

        // When
        let result = plan_user_tomorrow(&store, "u1", NOW, &SweepConfig::default());

        // Then
        assert!(matches!(result, Err(AppError::NoSubscriptions)));
    }

    #[test]
    fn plan_user_tomorrow__should_fail_when_nothing_scheduled_at_location() {
        // Given
        let store = maribor_store(1);
        store
            .insert_schedule(schedule(
                "glass",
                "Ptuj",
                GarbageType::Glass,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");

        // When
        let result = plan_user_tomorrow(&store, "u1", NOW, &SweepConfig::default());

        // Then
        assert!(matches!(result, Err(AppError::NoScheduleTomorrow)));
    }

    #[test]
    fn plan_user_tomorrow__should_reach_every_device_of_that_user_only() {
        // Given
        let store = maribor_store(2);
        store
            .insert_schedule(schedule(
                "organic",
                "Maribor",
                GarbageType::Organic,
                datetime!(2025-01-13 07:00 UTC),
            ))
            .expect("schedule");

        store
            .insert_subscription(subscription("s2-phone", "u2"))
            .expect("subscription");

        // When
        let intents =
            plan_user_tomorrow(&store, "u2", NOW, &SweepConfig::default()).expect("plan");

        // Then
        assert_eq!(intents.len(), 2);
        assert!(intents.iter().all(|intent| intent.user_id == "u2"));
        assert!(intents.iter().all(|intent| intent.payload.contains("organic")));
    }

    #[test]
    fn plan_broadcast__should_fail_without_subscriptions() {
        let store = MemoryStore::new();
        let message = AdHocMessage {
            title: "Notice".to_string(),
            body: "Depot closed".to_string(),
        };

        let result = plan_broadcast(&store, &message);

        assert!(matches!(result, Err(AppError::NoSubscriptions)));
    }

    #[tokio::test]
    async fn plan_broadcast__should_reach_every_subscription() {
        // Given
        let store = maribor_store(2);
        store
            .insert_subscription(subscription("s1-laptop", "u1"))
            .expect("subscription");
        let message = AdHocMessage {
            title: "Notice".to_string(),
            body: "Depot closed".to_string(),
        };
        let sender = TestSender::default();

        // When
        let intents = plan_broadcast(&store, &message).expect("plan");
        let report = deliver(&sender, intents, &SweepConfig::default()).await;

        // Then
        assert_eq!(report.delivered, 3);
        let payload: NotificationPayload =
            serde_json::from_str(&sender.sent()[0].1).expect("payload json");
        assert_eq!(payload.notification.title, "Notice");
        assert_eq!(payload.notification.body, "Depot closed");
    }

    #[test]
    fn plan_user_message__should_reject_blank_message_and_missing_user() {
        // Given
        let store = maribor_store(1);

        // When
        let blank = plan_user_message(
            &store,
            "u1",
            &AdHocMessage {
                title: " ".to_string(),
                body: "x".to_string(),
            },
        );
        let missing = plan_user_message(
            &store,
            "nobody",
            &AdHocMessage {
                title: "t".to_string(),
                body: "b".to_string(),
            },
        );

        // Then
        assert!(matches!(blank, Err(AppError::InvalidRequest(_))));
        assert!(matches!(missing, Err(AppError::NotFound("User"))));
    }

    #[test]
    fn subscribe__should_store_subscription_for_caller() {
        // Given
        let store = MemoryStore::new();
        let request = SubscribeRequest {
            endpoint: " https://push.example/device ".to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        };

        // When
        let subscription = subscribe(&store, "u1", request).expect("subscribe");

        // Then
        assert_eq!(subscription.endpoint, "https://push.example/device");
        let stored = store
            .subscriptions_for_users(&["u1".to_string()])
            .expect("query");
        assert_eq!(stored, vec![subscription]);
    }

    #[test]
    fn subscribe__should_reject_plain_http_and_missing_keys() {
        let store = MemoryStore::new();
        let insecure = SubscribeRequest {
            endpoint: "http://push.example/device".to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        };
        let keyless = SubscribeRequest {
            endpoint: "https://push.example/device".to_string(),
            keys: SubscriptionKeys {
                p256dh: String::new(),
                auth: "auth".to_string(),
            },
        };

        assert!(matches!(
            subscribe(&store, "u1", insecure),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            subscribe(&store, "u1", keyless),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
