use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::app::build_router;
use crate::config::AppConfig;
use crate::database::{Database, PgUserStore};
use crate::endpoints;
use crate::identity::FirebaseIdentityProvider;
use crate::pipeline::TracingReporter;
use crate::state::AppState;

pub async fn handle(config: &AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Mobile API in {:?} mode", config.environment);

    // Route declarations are checked before any external service is touched
    let table = endpoints::registry().load()?;

    let database = Database::connect(&config.database).await?;
    database.migrate().await?;
    database.health_check().await?;

    let identity = FirebaseIdentityProvider::new(&config.identity)?;
    let keys = identity
        .refresh_keys()
        .await
        .context("Failed to load identity provider signing keys")?;
    tracing::info!("Identity provider ready with {} signing keys", keys);

    let state = AppState::new(
        Arc::new(PgUserStore::new(&database)),
        Arc::new(identity),
        Arc::new(TracingReporter),
        config.security.allowed_platforms.clone(),
    );
    let app = build_router(&table, state, config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Mobile API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
