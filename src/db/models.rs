use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Lifecycle of a ledger row. Legal transitions:
/// `pending -> completed`, `pending -> failed` (settlement, exactly once),
/// `completed -> refunded` (refund, exactly once). Everything else is
/// rejected, in the queries by status-guarded UPDATEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Completed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted ledger row: one payment or one refund compensation entry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub transaction_id: String,
    pub user_id: i64,
    /// original_amount + commission_amount; the settled ledger quantity.
    pub amount: BigDecimal,
    pub original_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    pub currency: String,
    pub status: String,
    /// Encrypted at rest, decrypted only for display.
    pub card_last_four: String,
    pub payment_method: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::parse(&self.status)
    }
}

/// Row to insert; the surrogate id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: String,
    pub user_id: i64,
    pub amount: BigDecimal,
    pub original_amount: BigDecimal,
    pub commission_amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub card_last_four: String,
    pub payment_method: String,
    pub description: String,
}

/// Compensation audit record written alongside the negated ledger row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Refund {
    pub id: i64,
    pub payment_id: i64,
    pub refund_transaction_id: String,
    pub amount: BigDecimal,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregates over a created_at window. Sums default to zero via COALESCE,
/// never null. The average intentionally spans all rows in the window, not
/// just completed ones.
#[derive(Debug, FromRow)]
pub struct LedgerStats {
    pub total_transactions: i64,
    pub total_revenue: BigDecimal,
    pub total_original_revenue: BigDecimal,
    pub total_commission: BigDecimal,
    pub pending_transactions: i64,
    pub failed_transactions: i64,
    pub average_transaction_amount: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("settled"), None);
    }

    #[test]
    fn only_completed_is_refundable() {
        assert!(PaymentStatus::Completed.is_refundable());
        assert!(!PaymentStatus::Pending.is_refundable());
        assert!(!PaymentStatus::Failed.is_refundable());
        assert!(!PaymentStatus::Refunded.is_refundable());
    }

    #[test]
    fn pending_is_the_only_non_terminal_state() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
    }
}
