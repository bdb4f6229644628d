use crate::db::models::{LedgerStats, NewPayment, Payment, PaymentStatus, Refund};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Result, Transaction as SqlxTransaction};

// --- Ledger rows ---

pub async fn insert_payment<'e, E>(executor: E, payment: &NewPayment) -> Result<Payment>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (
            transaction_id, user_id, amount, original_amount, commission_amount,
            currency, status, card_last_four, payment_method, description
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(&payment.transaction_id)
    .bind(payment.user_id)
    .bind(&payment.amount)
    .bind(&payment.original_amount)
    .bind(&payment.commission_amount)
    .bind(&payment.currency)
    .bind(payment.status.as_str())
    .bind(&payment.card_last_four)
    .bind(&payment.payment_method)
    .bind(&payment.description)
    .fetch_one(executor)
    .await
}

pub async fn get_payment(pool: &PgPool, transaction_id: &str) -> Result<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(pool)
        .await
}

/// Locks the row for the duration of the surrounding transaction so
/// concurrent refunds of the same payment serialize.
pub async fn get_payment_for_update(
    executor: &mut SqlxTransaction<'_, Postgres>,
    transaction_id: &str,
) -> Result<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE transaction_id = $1 FOR UPDATE")
        .bind(transaction_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn list_user_payments(
    pool: &PgPool,
    user_id: i64,
    status: Option<PaymentStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Payment>> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_user_payments(
    pool: &PgPool,
    user_id: i64,
    status: Option<PaymentStatus>,
) -> Result<i64> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM payments WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .fetch_one(pool)
    .await
}

// --- Settlement ---

/// Moves a pending row to its terminal settlement state. The status guard
/// makes the update idempotent: settling an already-settled row affects zero
/// rows and never rewrites a terminal state.
pub async fn settle_payment(
    pool: &PgPool,
    transaction_id: &str,
    outcome: PaymentStatus,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE payments SET status = $2, updated_at = NOW() \
         WHERE transaction_id = $1 AND status = 'pending'",
    )
    .bind(transaction_id)
    .bind(outcome.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Rows stuck in `pending` past the staleness threshold, locked for the
/// sweep. SKIP LOCKED keeps concurrent sweepers and in-flight settlement
/// tasks from blocking on each other.
pub async fn get_stale_pending(
    executor: &mut SqlxTransaction<'_, Postgres>,
    stale_secs: f64,
    batch: i64,
) -> Result<Vec<Payment>> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE status = 'pending' AND created_at < NOW() - ($1 * INTERVAL '1 second')
        ORDER BY created_at ASC
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(stale_secs)
    .bind(batch)
    .fetch_all(&mut **executor)
    .await
}

pub async fn settle_payment_tx(
    executor: &mut SqlxTransaction<'_, Postgres>,
    transaction_id: &str,
    outcome: PaymentStatus,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE payments SET status = $2, updated_at = NOW() \
         WHERE transaction_id = $1 AND status = 'pending'",
    )
    .bind(transaction_id)
    .bind(outcome.as_str())
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

// --- Refund ---

pub async fn insert_refund(
    executor: &mut SqlxTransaction<'_, Postgres>,
    payment_id: i64,
    refund_transaction_id: &str,
    amount: &BigDecimal,
    reason: &str,
) -> Result<Refund> {
    sqlx::query_as::<_, Refund>(
        r#"
        INSERT INTO refunds (payment_id, refund_transaction_id, amount, reason, status)
        VALUES ($1, $2, $3, $4, 'completed')
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(refund_transaction_id)
    .bind(amount)
    .bind(reason)
    .fetch_one(&mut **executor)
    .await
}

/// Flips a completed payment to refunded. Guarded on the current status;
/// zero rows affected means the payment was not (or no longer) refundable.
pub async fn mark_refunded(
    executor: &mut SqlxTransaction<'_, Postgres>,
    payment_id: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE payments SET status = 'refunded', updated_at = NOW() \
         WHERE id = $1 AND status = 'completed'",
    )
    .bind(payment_id)
    .execute(&mut **executor)
    .await?;

    Ok(result.rows_affected())
}

// --- Statistics ---

pub async fn ledger_stats(
    pool: &PgPool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<LedgerStats> {
    sqlx::query_as::<_, LedgerStats>(
        r#"
        SELECT
            COUNT(*) AS total_transactions,
            COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0) AS total_revenue,
            COALESCE(SUM(original_amount) FILTER (WHERE status = 'completed'), 0) AS total_original_revenue,
            COALESCE(SUM(commission_amount) FILTER (WHERE status = 'completed'), 0) AS total_commission,
            COUNT(*) FILTER (WHERE status = 'pending') AS pending_transactions,
            COUNT(*) FILTER (WHERE status = 'failed') AS failed_transactions,
            COALESCE(AVG(amount), 0) AS average_transaction_amount
        FROM payments
        WHERE ($1::timestamptz IS NULL OR created_at >= $1)
          AND ($2::timestamptz IS NULL OR created_at <= $2)
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await
}
