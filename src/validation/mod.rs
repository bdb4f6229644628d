use crate::error::AppError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};

pub const MAX_PAGE_LIMIT: i64 = 100;
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Collects the names of required fields that are absent and fails with a
/// single 400 listing all of them, mirroring the service's error contract.
pub fn require_fields(fields: &[(&'static str, bool)]) -> Result<(), AppError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::MissingFields(missing))
    }
}

pub fn validate_positive_amount(amount: &BigDecimal) -> Result<(), AppError> {
    if amount <= &BigDecimal::from(0) {
        return Err(AppError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Out-of-range paging inputs are clamped rather than rejected: `page` floors
/// at 1, `limit` stays within 1..=MAX_PAGE_LIMIT.
pub fn clamp_pagination(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

/// Parses a statistics window bound: RFC 3339, or a bare `YYYY-MM-DD` which
/// snaps to the start of day for lower bounds and the end of day for upper
/// bounds so a date-only window stays inclusive.
pub fn parse_window_bound(raw: &str, upper: bool) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!(
            "invalid date '{}', expected RFC 3339 or YYYY-MM-DD",
            raw
        ))
    })?;

    let time = if upper {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };

    // and_hms_opt only fails on out-of-range components, which are fixed here
    time.map(|t| t.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("invalid date '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn collects_all_missing_fields() {
        let err = require_fields(&[("userId", false), ("amount", true), ("cvv", false)])
            .unwrap_err();
        match err {
            AppError::MissingFields(missing) => assert_eq!(missing, vec!["userId", "cvv"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn accepts_when_all_present() {
        assert!(require_fields(&[("userId", true), ("amount", true)]).is_ok());
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(validate_positive_amount(&BigDecimal::from_str("0.01").unwrap()).is_ok());
        assert!(validate_positive_amount(&BigDecimal::from(0)).is_err());
        assert!(validate_positive_amount(&BigDecimal::from(-5)).is_err());
    }

    #[test]
    fn clamps_pagination() {
        assert_eq!(clamp_pagination(None, None), (1, 10));
        assert_eq!(clamp_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_pagination(Some(-3), Some(-1)), (1, 1));
        assert_eq!(clamp_pagination(Some(2), Some(500)), (2, 100));
        assert_eq!(clamp_pagination(Some(3), Some(25)), (3, 25));
    }

    #[test]
    fn computes_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn parses_rfc3339_bounds() {
        let ts = parse_window_bound("2026-01-15T10:30:00Z", false).unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-15T10:30:00+00:00");
    }

    #[test]
    fn date_only_bounds_stay_inclusive() {
        let start = parse_window_bound("2026-01-15", false).unwrap();
        let end = parse_window_bound("2026-01-15", true).unwrap();
        assert!(start < end);
        assert_eq!(start.to_rfc3339(), "2026-01-15T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-01-15T23:59:59+00:00");
    }

    #[test]
    fn rejects_garbage_dates() {
        assert!(parse_window_bound("yesterday", false).is_err());
        assert!(parse_window_bound("2026-13-40", false).is_err());
    }
}
