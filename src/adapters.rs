use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::ports;
use crate::types::push::{Subscription, VapidConfig};

/// Push services drop a reminder nobody picked up within a day.
const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// Web Push delivery signed with the server's VAPID key.
#[derive(Clone)]
pub struct WebPushSender {
    vapid: Arc<VapidConfig>,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid: Arc::new(vapid),
            client: Arc::new(client),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.vapid.public_key
    }

    fn build_message(
        &self,
        subscription: &Subscription,
        payload: &str,
    ) -> Result<web_push::WebPushMessage, web_push::WebPushError> {
        let info = web_push::SubscriptionInfo::new(
            subscription.endpoint.as_str(),
            subscription.keys.p256dh.as_str(),
            subscription.keys.auth.as_str(),
        );
        let mut signature = web_push::VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
            &info,
        )?;
        signature.add_claim("sub", self.vapid.subject.as_str());

        let mut builder = web_push::WebPushMessageBuilder::new(&info)?;
        builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_ttl(PUSH_TTL_SECS);
        builder.set_vapid_signature(signature.build()?);
        builder.build()
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let message = self.build_message(subscription, payload)?;
            self.client.send(message).await
        })
    }
}
