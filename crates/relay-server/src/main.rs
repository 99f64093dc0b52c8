use std::path::PathBuf;
use std::sync::Arc;

use relay_indexer::build_resilient_adaptor;
use relay_server::{router, AppConfig, AppState, RuntimeSupervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("RELAY_CONFIG").ok().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;
    tracing::info!(
        max_elements = config.batcher.max_elements,
        max_size = config.batcher.max_size,
        max_time_seconds = config.batcher.max_time_seconds,
        indexer_host = %config.indexer.host,
        "starting relay"
    );

    let indexer = Arc::new(build_resilient_adaptor(config.indexer));
    let (supervisor, client) = RuntimeSupervisor::start(config.batcher, indexer);

    let app = router(AppState { client });
    let addr = std::env::var("RELAY_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    serve.await?;

    supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
