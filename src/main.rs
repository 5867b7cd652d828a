use std::sync::Arc;

use collection_console::api;
use collection_console::backend::http::HttpBackend;
use collection_console::backend::memory::MemoryBackend;
use collection_console::backend::CollectionBackend;
use collection_console::config::Config;
use collection_console::error::AppError;
use collection_console::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let backend: Arc<dyn CollectionBackend> = match &config.backend_url {
        Some(url) => {
            tracing::info!(
                backend_url = %url,
                timeout_ms = config.backend_timeout.as_millis() as u64,
                "using remote backend"
            );
            Arc::new(HttpBackend::new(
                url,
                config.backend_timeout,
                config.backend_token.clone(),
            )?)
        }
        None => {
            tracing::warn!("BACKEND_URL not set; using in-memory backend");
            Arc::new(MemoryBackend::new())
        }
    };

    let app = api::rest::router(Arc::new(AppState::new(backend)));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
