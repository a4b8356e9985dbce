// src/migrate.rs - Versioned loader for stored product records
//
// Stored data may predate the current shape: camelCase field names, epoch
// millisecond timestamps, or a single top-level expiration date instead of a
// batch collection. Every record is decoded through a tolerant raw shape and
// canonicalized here, independent of where it came from (local store, backup
// file, cloud snapshot).
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::models::{Batch, Product, DEFAULT_LOT_LABEL};

#[derive(Debug, Deserialize)]
struct StoredBatch {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "expirationDate")]
    expiration_date: NaiveDate,
    #[serde(default = "default_quantity")]
    quantity: u32,
    #[serde(default, alias = "lotNumber")]
    lot_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoredProduct {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    barcode: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(default, alias = "addedAt", deserialize_with = "deserialize_timestamp")]
    added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    batches: Option<Vec<StoredBatch>>,
    /// Legacy single-date shape, superseded by `batches`.
    #[serde(default, alias = "expirationDate")]
    expiration_date: Option<NaiveDate>,
}

fn default_quantity() -> u32 {
    1
}

/// Accepts both RFC 3339 strings and legacy epoch milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimestampCompat {
        Rfc3339(DateTime<Utc>),
        Millis(i64),
    }

    let raw = Option::<TimestampCompat>::deserialize(deserializer)?;
    Ok(raw.and_then(|ts| match ts {
        TimestampCompat::Rfc3339(dt) => Some(dt),
        TimestampCompat::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
    }))
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn canonical_batch(stored: StoredBatch) -> Batch {
    Batch {
        id: stored
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_id),
        expiration_date: stored.expiration_date,
        quantity: stored.quantity,
        lot_number: stored.lot_number,
    }
}

fn canonicalize(stored: StoredProduct, today: NaiveDate) -> Product {
    let mut batches: Vec<Batch> = match stored.batches {
        Some(batches) => batches.into_iter().map(canonical_batch).collect(),
        None => stored
            .expiration_date
            .map(|expiration_date| {
                vec![Batch {
                    id: generate_id(),
                    expiration_date,
                    quantity: 1,
                    lot_number: Some(DEFAULT_LOT_LABEL.to_string()),
                }]
            })
            .unwrap_or_default(),
    };

    // The non-empty-batches invariant is repaired rather than silently
    // dropping the record: a zero-batch product gets one synthetic batch
    // dated today.
    if batches.is_empty() {
        log::warn!(
            "Product '{}' loaded without batches; assigning a synthetic batch dated {}",
            stored.name,
            today
        );
        batches.push(Batch {
            id: generate_id(),
            expiration_date: today,
            quantity: 1,
            lot_number: Some(DEFAULT_LOT_LABEL.to_string()),
        });
    }

    Product {
        id: stored
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_id),
        name: stored.name,
        brand: stored.brand,
        barcode: stored.barcode,
        category: stored.category,
        image_url: stored.image_url,
        added_at: stored.added_at.unwrap_or_else(Utc::now),
        batches,
    }
}

/// Decodes one stored record into the canonical shape. Records that cannot
/// be decoded at all are dropped with a logged warning.
pub fn canonical_product(value: serde_json::Value, today: NaiveDate) -> Option<Product> {
    match serde_json::from_value::<StoredProduct>(value) {
        Ok(stored) => Some(canonicalize(stored, today)),
        Err(e) => {
            log::warn!("Dropping undecodable product record: {}", e);
            None
        }
    }
}

/// Canonicalizes a whole stored collection.
pub fn canonical_products(values: Vec<serde_json::Value>, today: NaiveDate) -> Vec<Product> {
    values
        .into_iter()
        .filter_map(|value| canonical_product(value, today))
        .collect()
}
