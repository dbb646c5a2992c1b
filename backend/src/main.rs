use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_backend::{
    config::Config,
    db::connection::{create_pool_with_config, run_migrations, PoolConfig},
    routes::build_router,
    services::identity::{GithubVerifier, IdentityVerifier},
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        database_max_connections = config.database_max_connections,
        cookie_secure = config.cookie_secure,
        frontend_url = %config.frontend_url,
        cors_allow_origins = ?config.cors_allow_origins,
        github_client_id = %config.github_client_id,
        github_client_secret = %mask_secret(&config.github_client_secret),
        github_callback_url = %config.github_callback_url,
        "Loaded configuration from environment/.env"
    );

    // Schema and connectivity failures at boot are fatal.
    let pool = create_pool_with_config(
        &config.database_url,
        PoolConfig {
            max_connections: config.database_max_connections,
            ..PoolConfig::default()
        },
    )
    .await?;
    run_migrations(&pool).await?;

    let identity: Arc<dyn IdentityVerifier> = Arc::new(GithubVerifier::new(&config)?);
    let port = config.port;
    let state = AppState::from_pool(pool, identity, config)?;
    let store = state.store.clone();

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(healthy = store.is_healthy(), "Server stopped");
    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
