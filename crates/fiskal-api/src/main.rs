//! Fiskal API Server

use fiskal_api::auth::InMemoryDirectory;
use fiskal_api::{create_router, AppState};
use fiskal_core::AppConfig;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fiskal_api=debug,tower_http=debug,audit=info".into()),
        )
        .init();

    // In production a missing signing secret aborts here, before the
    // server binds.
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // The real deployment wires the external directory client here; the
    // in-memory directory keeps local development self-contained.
    let directory = Arc::new(InMemoryDirectory::new());
    let state = Arc::new(AppState::new(config, directory));

    // Periodic eviction of idle rate-limit counters.
    let _sweeper = fiskal_api::middleware::RateLimiter::spawn_sweeper(
        Arc::clone(&state.limiter),
        Duration::from_secs(60),
    );

    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Fiskal API server starting on http://{}", addr);

    // ConnectInfo carries the peer address the rate limiter keys on.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
