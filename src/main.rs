mod config;
mod routes;
mod services;
mod source;
mod state;
mod terrain;
mod version;

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match config::ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let source = source::build_source(&config);
    let bind_addr = config.bind_addr();
    let state = state::AppState::new(config, source);
    tracing::info!(
        banner = %state.build.banner(),
        source = state.source.name(),
        stream_fps = state.config.stream_fps,
        "depth server starting"
    );

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %bind_addr, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    spawn_signal_handlers(state.shutdown.clone());

    let shutdown = state.shutdown.clone();
    let app = routes::app(state);
    tracing::info!(addr = %bind_addr, "depth server listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        tracing::error!(error = %e, "server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("depth server stopped");
    ExitCode::SUCCESS
}

/// Cancel `shutdown` on Ctrl+C, and on SIGTERM where signals exist.
fn spawn_signal_handlers(shutdown: CancellationToken) {
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("ctrl-c received, shutting down");
        on_ctrl_c.cancel();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sig) = signal(SignalKind::terminate()) {
            sig.recv().await;
            tracing::info!("SIGTERM received, shutting down");
            shutdown.cancel();
        }
    });
    #[cfg(not(unix))]
    drop(shutdown);
}
