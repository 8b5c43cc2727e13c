//! # PropDesk Worker
//!
//! Runs the status sweep on a fixed interval until Ctrl+C or SIGTERM.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/propdesk cargo run -p propdesk-worker
//! ```

use propdesk_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use propdesk_worker::{config::WorkerConfig, sweeper::Sweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "propdesk_worker=debug,propdesk_shared=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "PropDesk worker starting");

    let pool = create_pool(DatabaseConfig::with_url(config.database_url.clone(), config.max_connections)).await?;

    let sweeper = Sweeper::new(pool.clone(), config.sweep_interval());
    let token = sweeper.shutdown_token();

    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        token.cancel();
    });

    sweeper.run().await;

    close_pool(pool).await;
    tracing::info!("Worker stopped");

    Ok(())
}
