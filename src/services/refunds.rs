//! Refund compensation.
//!
//! The only multi-statement unit of work in the service: the audit row, the
//! negated ledger row and the status flip on the original either all commit
//! or none do. The original row is locked for the duration, so concurrent
//! refunds of the same transaction serialize and the loser sees `refunded`.

use sqlx::PgPool;

use crate::db::models::{NewPayment, Payment, PaymentStatus, Refund};
use crate::db::queries;
use crate::error::AppError;
use crate::txid;

pub struct RefundOutcome {
    pub original: Payment,
    pub ledger_row: Payment,
    pub refund: Refund,
}

pub struct RefundService {
    pool: PgPool,
}

impl RefundService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn refund(
        &self,
        transaction_id: &str,
        reason: Option<String>,
    ) -> Result<RefundOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let payment = queries::get_payment_for_update(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        match payment.status() {
            Some(PaymentStatus::Completed) => {}
            _ => {
                tx.rollback().await?;
                return Err(AppError::NotRefundable(format!(
                    "transaction {} has status '{}', only completed transactions can be refunded",
                    transaction_id, payment.status
                )));
            }
        }

        let refund_transaction_id = txid::generate();
        let description = match &reason {
            Some(r) => format!("Refund for transaction {}: {}", transaction_id, r),
            None => format!("Refund for transaction {}", transaction_id),
        };
        let reason = reason.unwrap_or_else(|| "Customer request".to_string());

        let refund =
            queries::insert_refund(&mut tx, payment.id, &refund_transaction_id, &payment.amount, &reason)
                .await?;

        // Paired negative entry: sum(amount) over original + refund is zero.
        let ledger_row = queries::insert_payment(
            &mut *tx,
            &NewPayment {
                transaction_id: refund_transaction_id,
                user_id: payment.user_id,
                amount: -&payment.amount,
                original_amount: -&payment.original_amount,
                commission_amount: -&payment.commission_amount,
                currency: payment.currency.clone(),
                status: PaymentStatus::Refunded,
                card_last_four: payment.card_last_four.clone(),
                payment_method: "refund".to_string(),
                description,
            },
        )
        .await?;

        let updated = queries::mark_refunded(&mut tx, payment.id).await?;
        if updated == 0 {
            // Unreachable under the row lock, kept as a last-resort guard.
            tx.rollback().await?;
            return Err(AppError::NotRefundable(format!(
                "transaction {} is no longer refundable",
                transaction_id
            )));
        }

        tx.commit().await?;

        tracing::info!(
            original = %payment.transaction_id,
            refund = %ledger_row.transaction_id,
            amount = %payment.amount,
            "refund processed"
        );

        Ok(RefundOutcome {
            original: payment,
            ledger_row,
            refund,
        })
    }
}
