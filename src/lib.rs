pub mod accounts;
pub mod adapters;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod password;
pub mod permissions;
pub mod ports;
pub mod push;
pub mod roles;
pub mod schedules;
pub mod state;
pub mod store;
pub mod types;

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;

pub use push::{VapidKeys, generate_vapid_keys};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid auth configuration: {0}")]
    Auth(#[from] auth::AuthError),
    #[error("failed to open document store: {0}")]
    Store(#[from] error::StoreError),
    #[error("failed to create administrator: {0}")]
    Bootstrap(#[from] error::AppError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens the store, seeds the administrator, starts the daily sweep and serves HTTP
/// until the listener fails.
pub async fn serve(config: config::AppConfig) -> Result<(), StartupError> {
    let auth = auth::AuthState::from_encoded_key(&config.auth.key)?;
    let store: Arc<dyn ports::DocumentStore> = match config.data_dir.as_deref() {
        Some(data_dir) => Arc::new(store::MemoryStore::open(data_dir)?),
        None => {
            tracing::warn!("no data directory configured; records live in memory only");
            Arc::new(store::MemoryStore::new())
        }
    };

    if let Some(admin) = config.admin.as_ref()
        && let Some(user) = accounts::bootstrap_admin(
            store.as_ref(),
            &admin.email,
            &admin.password,
            OffsetDateTime::now_utc(),
        )?
    {
        tracing::info!(user_id = %user.id, email = %user.email, "created bootstrap administrator");
    }

    let sender = push::sender_from_config(&config);
    let sweep = sender.clone().map(|sender| {
        tracing::info!(
            at = %config.sweep.at,
            utc_offset = %config.sweep.utc_offset,
            "daily notification sweep enabled"
        );
        push::start_daily_sweep(sender, Arc::clone(&store), config.sweep)
    });

    let state = state::AppState {
        auth: Arc::new(auth),
        store,
        push: sender,
        sweep: config.sweep,
    };

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    let result = axum::serve(listener, app::app(state)).await;
    if let Some(handle) = sweep {
        handle.abort();
    }
    Ok(result?)
}
