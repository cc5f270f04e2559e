use crate::adapters::WebPushSender;
use crate::auth::AuthState;
use crate::config::SweepConfig;
use crate::ports::store::DocumentStore;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthState>,
    pub store: Arc<dyn DocumentStore>,
    /// `None` when VAPID is not configured.
    pub push: Option<WebPushSender>,
    pub sweep: SweepConfig,
}
