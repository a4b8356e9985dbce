// src/expiration.rs - Expiration classification
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::Product;

/// Batches expiring within this many days put a product in WARNING.
pub const WARNING_WINDOW_DAYS: i64 = 7;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpirationStatus {
    Expired,
    Warning,
    Good,
}

/// Reference "today" for classification: the server's local calendar date.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Calendar-day distance between `today` and `expiration`. Both operands are
/// plain dates, so time-of-day never leaks into the comparison.
pub fn days_until(today: NaiveDate, expiration: NaiveDate) -> i64 {
    (expiration - today).num_days()
}

pub fn classify(diff_days: i64) -> ExpirationStatus {
    if diff_days < 0 {
        ExpirationStatus::Expired
    } else if diff_days <= WARNING_WINDOW_DAYS {
        ExpirationStatus::Warning
    } else {
        ExpirationStatus::Good
    }
}

/// Soonest expiration date over all batches. `None` for a product with no
/// batches, which is excluded from every date-bounded view.
pub fn nearest_expiration(product: &Product) -> Option<NaiveDate> {
    product.batches.iter().map(|b| b.expiration_date).min()
}

pub fn nearest_diff_days(product: &Product, today: NaiveDate) -> Option<i64> {
    nearest_expiration(product).map(|date| days_until(today, date))
}

/// Aggregate status of a product: the classification of its nearest batch.
pub fn product_status(product: &Product, today: NaiveDate) -> Option<ExpirationStatus> {
    nearest_diff_days(product, today).map(classify)
}

pub fn has_expired_batch(product: &Product, today: NaiveDate) -> bool {
    product
        .batches
        .iter()
        .any(|b| days_until(today, b.expiration_date) < 0)
}

/// Warning statistics count a product only when nothing in it is expired yet
/// and at least one batch sits inside the 0..=7 day window. An expired batch
/// suppresses the warning so a product is never counted twice.
pub fn counts_as_warning(product: &Product, today: NaiveDate) -> bool {
    if has_expired_batch(product, today) {
        return false;
    }
    product.batches.iter().any(|b| {
        let diff = days_until(today, b.expiration_date);
        (0..=WARNING_WINDOW_DAYS).contains(&diff)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Batch;
    use chrono::{TimeZone, Utc};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn batch(expiration: &str, quantity: u32) -> Batch {
        Batch {
            id: uuid::Uuid::new_v4().to_string(),
            expiration_date: date(expiration),
            quantity,
            lot_number: None,
        }
    }

    fn product(batches: Vec<Batch>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Milk".to_string(),
            brand: None,
            barcode: None,
            category: None,
            image_url: None,
            added_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            batches,
        }
    }

    #[test]
    fn test_classify_boundaries() {
        let today = date("2024-01-06");
        assert_eq!(classify(days_until(today, today)), ExpirationStatus::Warning);
        assert_eq!(
            classify(days_until(today, date("2024-01-05"))),
            ExpirationStatus::Expired
        );
        assert_eq!(
            classify(days_until(today, date("2024-01-13"))),
            ExpirationStatus::Warning
        );
        assert_eq!(
            classify(days_until(today, date("2024-01-14"))),
            ExpirationStatus::Good
        );
    }

    #[test]
    fn test_nearest_batch_and_aggregate_status() {
        let today = date("2024-01-06");
        let p = product(vec![batch("2024-01-10", 2), batch("2024-01-05", 1)]);

        assert_eq!(nearest_expiration(&p), Some(date("2024-01-05")));
        assert_eq!(nearest_diff_days(&p, today), Some(-1));
        assert_eq!(product_status(&p, today), Some(ExpirationStatus::Expired));
        assert_eq!(p.total_quantity(), 3);
    }

    #[test]
    fn test_zero_batches_has_no_status() {
        let today = date("2024-01-06");
        let p = product(vec![]);
        assert_eq!(nearest_expiration(&p), None);
        assert_eq!(product_status(&p, today), None);
    }

    #[test]
    fn test_expired_batch_suppresses_warning() {
        let today = date("2024-01-06");
        // One batch expired, another inside the warning window.
        let mixed = product(vec![batch("2024-01-05", 1), batch("2024-01-08", 1)]);
        assert!(!counts_as_warning(&mixed, today));
        assert!(has_expired_batch(&mixed, today));

        let warning_only = product(vec![batch("2024-01-08", 1), batch("2024-02-01", 4)]);
        assert!(counts_as_warning(&warning_only, today));

        let good_only = product(vec![batch("2024-02-01", 4)]);
        assert!(!counts_as_warning(&good_only, today));
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_string(&ExpirationStatus::Expired).unwrap(),
            "\"EXPIRED\""
        );
        assert_eq!(ExpirationStatus::Warning.to_string(), "WARNING");
        assert_eq!("GOOD".parse::<ExpirationStatus>().unwrap(), ExpirationStatus::Good);
    }
}
