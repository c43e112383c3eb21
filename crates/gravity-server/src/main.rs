use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use gravity_server::config::ServerConfig;
use gravity_server::{build_app, spawn_session_reaper};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("GRAVITY_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() {
    init_tracing();
    tracing::info!("Gravity control center starting");

    let config = ServerConfig::load();
    if let Err(problems) = config.validate() {
        for problem in &problems {
            tracing::error!("Invalid configuration: {problem}");
        }
        std::process::exit(1);
    }

    let addr = config.listen_addr.clone();
    let (app, state) = build_app(config);
    spawn_session_reaper(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        },
    };
    tracing::info!("Gravity control center listening on {addr}");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
