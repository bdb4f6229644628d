pub mod refunds;
pub mod settlement;

pub use refunds::RefundService;
pub use settlement::{reconcile_batch, run_reconciliation, spawn_settlement};
