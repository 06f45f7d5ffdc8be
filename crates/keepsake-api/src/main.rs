//! Keepsake REST API entry point.
//!
//! Binary name: `keepsake`
//!
//! Parses CLI arguments, initializes tracing, database, and services,
//! then serves the REST API until Ctrl+C or SIGTERM.

mod http;
mod state;

use clap::Parser;

use state::AppState;

/// Keepsake life-story interview backend.
#[derive(Parser)]
#[command(name = "keepsake", version)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000, env = "KEEPSAKE_PORT")]
    port: u16,

    /// Export spans via OpenTelemetry (stdout exporter).
    #[arg(long, default_value_t = false)]
    otel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    keepsake_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Keepsake API listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    keepsake_observe::tracing_setup::shutdown_tracing();
    tracing::info!("server stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// In-flight extraction tasks may be dropped here without persisting
/// partial results; extraction is advisory, the conversation itself is
/// the source of truth.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
