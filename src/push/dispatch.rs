use crate::ports::push::PushSender;
use crate::push::sweep::DeliveryIntent;

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub(crate) enum DeliveryFailure {
    #[error("push delivery rejected: {0}")]
    Rejected(String),
    #[error("push delivery timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Sends every intent concurrently and waits for all of them. A failed or timed out
/// delivery is logged and counted; it never cancels its siblings.
pub(crate) async fn dispatch_all<S: PushSender>(
    sender: &S,
    intents: Vec<DeliveryIntent>,
    timeout: Duration,
) -> DispatchReport {
    let mut report = DispatchReport {
        attempted: intents.len(),
        ..DispatchReport::default()
    };
    let mut tasks = JoinSet::new();
    for intent in intents {
        let sender = sender.clone();
        tasks.spawn(async move {
            let result = deliver(&sender, &intent, timeout).await;
            if let Err(err) = &result {
                tracing::warn!(
                    user_id = %intent.user_id,
                    endpoint = %intent.subscription.endpoint,
                    error = %err,
                    "push delivery failed"
                );
            }
            result.is_ok()
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => report.delivered += 1,
            Ok(false) => report.failed += 1,
            Err(err) => {
                tracing::error!(error = %err, "push delivery task aborted");
                report.failed += 1;
            }
        }
    }
    report
}

async fn deliver<S: PushSender>(
    sender: &S,
    intent: &DeliveryIntent,
    timeout: Duration,
) -> Result<(), DeliveryFailure> {
    match tokio::time::timeout(timeout, sender.send(&intent.subscription, &intent.payload)).await
    {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(DeliveryFailure::Rejected(err.to_string())),
        Err(_) => Err(DeliveryFailure::TimedOut(timeout)),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::push::sweep::tests::subscription;
    use crate::types::push::Subscription;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    pub(crate) struct TestSendError;

    impl std::fmt::Display for TestSendError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test send error")
        }
    }

    /// Records every delivery; endpoints listed in `failing` are rejected and those in
    /// `hanging` never complete.
    #[derive(Clone, Default)]
    pub(crate) struct TestSender {
        pub(crate) sent: Arc<Mutex<Vec<(String, String)>>>,
        pub(crate) failing: Arc<Vec<String>>,
        pub(crate) hanging: Arc<Vec<String>>,
    }

    impl TestSender {
        pub(crate) fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    impl PushSender for TestSender {
        type Error = TestSendError;
        type Fut<'a>
            = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
        where
            Self: 'a;

        fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a> {
            let endpoint = subscription.endpoint.clone();
            let payload = payload.to_string();
            Box::pin(async move {
                if self.hanging.contains(&endpoint) {
                    std::future::pending::<()>().await;
                }
                if self.failing.contains(&endpoint) {
                    return Err(TestSendError);
                }
                self.sent.lock().expect("sent lock").push((endpoint, payload));
                Ok(())
            })
        }
    }

    fn intent(id: &str) -> DeliveryIntent {
        DeliveryIntent {
            user_id: format!("user-{id}"),
            subscription: subscription(id, &format!("user-{id}")),
            payload: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatch_all__should_continue_after_failed_delivery() {
        // Given
        let sender = TestSender {
            failing: Arc::new(vec!["https://push.example/b".to_string()]),
            ..TestSender::default()
        };
        let intents = vec![intent("a"), intent("b"), intent("c")];

        // When
        let report = dispatch_all(&sender, intents, Duration::from_secs(5)).await;

        // Then
        assert_eq!(
            report,
            DispatchReport {
                attempted: 3,
                delivered: 2,
                failed: 1,
            }
        );
        let mut endpoints: Vec<String> = sender.sent().into_iter().map(|(e, _)| e).collect();
        endpoints.sort();
        assert_eq!(
            endpoints,
            vec!["https://push.example/a", "https://push.example/c"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_all__should_count_timeout_as_failure() {
        // Given
        let sender = TestSender {
            hanging: Arc::new(vec!["https://push.example/slow".to_string()]),
            ..TestSender::default()
        };
        let intents = vec![intent("slow"), intent("fast")];

        // When
        let report = dispatch_all(&sender, intents, Duration::from_secs(10)).await;

        // Then
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn dispatch_all__should_report_nothing_for_empty_batch() {
        let sender = TestSender::default();

        let report = dispatch_all(&sender, Vec::new(), Duration::from_secs(1)).await;

        assert_eq!(report, DispatchReport::default());
        assert!(sender.sent().is_empty());
    }
}
