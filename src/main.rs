use cinescope_payments::services::settlement::{run_reconciliation, SettlementConfig};
use cinescope_payments::{config, crypto::CardCipher, db, create_app, AppState};
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let cipher = CardCipher::new(&config.encryption_key)
        .map_err(|e| anyhow::anyhow!("failed to initialize card cipher: {}", e))?;

    // Reconciliation sweep for settlement timers lost to a crash
    let settlement = SettlementConfig {
        delay_ms: config.settlement_delay_ms,
        success_rate: config.settlement_success_rate,
    };
    tokio::spawn(run_reconciliation(
        pool.clone(),
        settlement,
        config.reconcile_interval_secs,
        config.reconcile_stale_secs,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let app = create_app(AppState {
        db: pool,
        config,
        cipher,
    });

    tracing::info!("payment service listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
