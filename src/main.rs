// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook Relay Service
//!
//! Serves the form site and relays submissions to webhook endpoints.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `OPERATOR_WEBHOOK_URL`: Endpoint receiving every submission (required)
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:5000)
//! - `PUBLIC_URL`: Base for page links when requests carry no `Origin`
//! - `COOLDOWN_MS`: Per-client cooldown in milliseconds (default: 25000)
//! - `RETENTION_SECS`: Idle throttle entry retention (default: 3600)
//! - `DELIVERY_TIMEOUT_MS`: Outbound request timeout (default: 10000)
//! - `STATIC_DIR` / `SHELL_FILE`: Built site and its shell (default: dist/index.html)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use webhook_relay::{
    config::Config,
    handlers::{router, AppState},
    metrics::RelayMetrics,
    notifier::HttpNotifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        cooldown_ms = config.throttle.cooldown_ms,
        retention_secs = config.throttle.retention_secs,
        static_dir = %config.site.static_dir.display(),
        "Starting webhook relay"
    );

    let notifier = HttpNotifier::new(config.delivery.timeout())?;
    let metrics = RelayMetrics::new()?;
    let sweep_interval = config.throttle.sweep_interval();
    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = Arc::new(AppState::new(config, Arc::new(notifier), metrics));

    // Spawn throttle sweep task
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            sweep_state.relay.sweep(Instant::now()).await;
        }
    });

    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
