//! Haunted House Back binary entrypoint wiring the Alexa, IFTTT, trigger and SSE surfaces.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use haunted_house_back::{build_router, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let port = config.port;
    #[cfg(feature = "redis-store")]
    let redis_url = config.redis_url.clone();

    let app_state = AppState::new(config).context("building application state")?;

    #[cfg(feature = "redis-store")]
    match redis_url {
        Some(url) => spawn_redis_supervisor(app_state.clone(), url),
        None => info!("REDIS_URL not set; event gateway tokens are kept in memory only"),
    }

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    app_state.shutdown();
    info!("server stopped");
    Ok(())
}

/// Connect Redis in the background; tokens stay in memory until it is healthy.
#[cfg(feature = "redis-store")]
fn spawn_redis_supervisor(state: haunted_house_back::state::SharedState, url: String) {
    use std::sync::Arc;

    use haunted_house_back::{
        dao::{
            storage::StorageError,
            token_store::{
                TokenStore,
                redis::{RedisConfig, RedisTokenStore},
            },
        },
        services::token_store_supervisor,
    };

    tokio::spawn(token_store_supervisor::run(state, move || {
        let config = RedisConfig::new(url.clone());
        async move {
            let store = RedisTokenStore::connect(config)
                .await
                .map_err(StorageError::from)?;
            Ok(Arc::new(store) as Arc<dyn TokenStore>)
        }
    }));
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
