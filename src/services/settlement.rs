//! Asynchronous settlement of pending transactions.
//!
//! Each created payment gets a detached task that waits out the simulated
//! processor latency, flips a weighted coin and moves the row to
//! `completed` or `failed`. The UPDATE is guarded on `status = 'pending'`,
//! so retries and duplicate settlements are no-ops. A reconciliation sweep
//! picks up rows whose timer was lost to a crash.

use rand::Rng;
use sqlx::PgPool;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::db::models::PaymentStatus;
use crate::db::queries;

const SETTLE_MAX_ATTEMPTS: u32 = 3;
const SETTLE_RETRY_BACKOFF_MS: u64 = 200;
const RECONCILE_BATCH: i64 = 10;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub delay_ms: u64,
    pub success_rate: f64,
}

fn simulate_outcome(success_rate: f64) -> PaymentStatus {
    if rand::thread_rng().gen::<f64>() < success_rate {
        PaymentStatus::Completed
    } else {
        PaymentStatus::Failed
    }
}

/// Fire-and-forget settlement for one transaction. The caller's request has
/// already returned; a client disconnect never cancels this.
pub fn spawn_settlement(pool: PgPool, config: SettlementConfig, transaction_id: String) {
    tokio::spawn(async move {
        sleep(Duration::from_millis(config.delay_ms)).await;

        let outcome = simulate_outcome(config.success_rate);
        settle_with_retries(&pool, &transaction_id, outcome).await;
    });
}

/// Bounded retries on store errors; on exhaustion the row stays `pending`
/// and remains queryable until the reconciliation sweep picks it up.
async fn settle_with_retries(pool: &PgPool, transaction_id: &str, outcome: PaymentStatus) {
    for attempt in 1..=SETTLE_MAX_ATTEMPTS {
        match queries::settle_payment(pool, transaction_id, outcome).await {
            Ok(0) => {
                debug!(
                    transaction_id,
                    "settlement skipped, row already in a terminal state"
                );
                return;
            }
            Ok(_) => {
                info!(transaction_id, status = %outcome, "payment settled");
                return;
            }
            Err(e) if attempt < SETTLE_MAX_ATTEMPTS => {
                warn!(
                    transaction_id,
                    attempt,
                    "settlement write failed, retrying: {}",
                    e
                );
                sleep(Duration::from_millis(SETTLE_RETRY_BACKOFF_MS * attempt as u64)).await;
            }
            Err(e) => {
                error!(
                    transaction_id,
                    "settlement write failed after {} attempts, row stays pending: {}",
                    SETTLE_MAX_ATTEMPTS,
                    e
                );
                return;
            }
        }
    }
}

/// Background loop settling rows stuck in `pending` past the staleness
/// threshold, covering in-process timers lost to a crash. Uses
/// `FOR UPDATE SKIP LOCKED` so multiple instances can sweep concurrently.
pub async fn run_reconciliation(
    pool: PgPool,
    config: SettlementConfig,
    interval_secs: u64,
    stale_secs: u64,
) {
    info!("settlement reconciliation sweep started");

    loop {
        sleep(Duration::from_secs(interval_secs)).await;

        match reconcile_batch(&pool, &config, stale_secs).await {
            Ok(0) => {}
            Ok(n) => info!(count = n, "reconciled stale pending payments"),
            Err(e) => error!("reconciliation batch error: {}", e),
        }
    }
}

pub async fn reconcile_batch(
    pool: &PgPool,
    config: &SettlementConfig,
    stale_secs: u64,
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    let stale = queries::get_stale_pending(&mut tx, stale_secs as f64, RECONCILE_BATCH).await?;
    if stale.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    let mut settled = 0;
    for payment in &stale {
        let outcome = simulate_outcome(config.success_rate);
        let updated = queries::settle_payment_tx(&mut tx, &payment.transaction_id, outcome).await?;
        if updated > 0 {
            debug!(
                transaction_id = %payment.transaction_id,
                status = %outcome,
                "stale payment reconciled"
            );
            settled += 1;
        }
    }

    tx.commit().await?;
    Ok(settled)
}
