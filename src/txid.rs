//! Transaction id generation: `txn_<unix_millis>_<8 hex chars>`.
//! Unguessable enough to avoid collisions in practice; the UNIQUE constraint
//! on `payments.transaction_id` is the actual correctness backstop.

use chrono::Utc;
use uuid::Uuid;

pub fn generate() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("txn_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn has_expected_shape() {
        let id = generate();
        assert!(id.starts_with("txn_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ten_thousand_ids_contain_no_duplicates() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
