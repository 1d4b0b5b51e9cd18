//! Notification sync daemon.
//!
//! Keeps one user's notification view in sync with the storefront backend and
//! prints a toast line for every new notification.
//!
//! # Usage
//!
//! ```bash
//! STOREFRONT_API_URL=https://shop.example.ph/api \
//! STOREFRONT_API_TOKEN=... \
//!   cargo run --bin storefront-sync
//! ```
//!
//! Variables may also come from a `.env` file. Set `RUST_LOG` to change the
//! log filter.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use storefront::events::SharedEventBus;
use storefront::notifications::NotificationEnvironment;
use storefront::{Credentials, NotificationReconciler, StorefrontConfig, StorefrontEvent};
use storefront_core::environment::SystemClock;
use storefront_core::event_bus::BroadcastEventBus;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=info,storefront_runtime=info")),
        )
        .init();

    let config = StorefrontConfig::from_env().context("Invalid storefront configuration")?;
    let token = std::env::var("STOREFRONT_API_TOKEN")
        .context("STOREFRONT_API_TOKEN must be set to a user's bearer token")?;

    info!(api_url = %config.api_url, polling = ?config.polling, "Starting notification sync");

    let api = Arc::new(
        config
            .api_client(Credentials::Bearer(token))
            .context("Failed to build HTTP client")?,
    );
    let events: SharedEventBus = Arc::new(BroadcastEventBus::<StorefrontEvent>::default());
    let mut toasts = events.subscribe();

    let environment =
        NotificationEnvironment::new(api, Arc::clone(&events), Arc::new(SystemClock))
            .with_order_refresh_delay(config.order_refresh_delay);
    let reconciler = NotificationReconciler::new(environment, config.polling);

    let mut initial = reconciler.start().await?;
    initial.wait().await;
    info!(unread = reconciler.unread_count().await, "Initial sync complete");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Shutting down");
                break;
            },
            event = toasts.recv() => match event {
                Ok(event) => print_toast(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Toast printer lagged behind the event bus");
                },
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    reconciler.stop().await?;
    reconciler.shutdown(SHUTDOWN_TIMEOUT).await?;
    Ok(())
}

fn print_toast(event: &StorefrontEvent) {
    if let Some(toast) = event.toast() {
        println!("[{:?}] {}: {}", toast.kind, toast.title, toast.message);
    }
}
