// src/backup.rs - Snapshot export/import
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiError;
use crate::inventory::Inventory;
use crate::migrate;
use crate::models::{BackupDocument, BarcodeMemory, Product, BACKUP_VERSION};

/// Serializes the full application state into a transportable document.
pub fn export_snapshot(inventory: &Inventory) -> BackupDocument {
    BackupDocument {
        products: inventory.products.clone(),
        barcode_db: inventory.barcode_db.clone(),
        version: BACKUP_VERSION.to_string(),
    }
}

/// Tolerant document shape: product records are canonicalized individually,
/// so a snapshot written by an older version still imports.
#[derive(Debug, Deserialize)]
struct RawBackup {
    products: Vec<serde_json::Value>,
    #[serde(default, alias = "barcodeDb")]
    barcode_db: BarcodeMemory,
}

/// Parses a backup payload. Accepts the current document shape and the
/// legacy bare-array-of-products shape (barcode memory defaults to empty).
/// Anything else is a format error; importing replaces state wholesale, so
/// nothing is touched on failure.
pub fn import_snapshot(
    payload: serde_json::Value,
    today: NaiveDate,
) -> Result<(Vec<Product>, BarcodeMemory), ApiError> {
    if let Some(array) = payload.as_array() {
        let products = migrate::canonical_products(array.clone(), today);
        return Ok((products, BarcodeMemory::new()));
    }

    if payload.is_object() && payload.get("products").map(|p| p.is_array()).unwrap_or(false) {
        let raw: RawBackup = serde_json::from_value(payload)
            .map_err(|e| ApiError::invalid_backup_format(&e.to_string()))?;
        let products = migrate::canonical_products(raw.products, today);
        return Ok((products, raw.barcode_db));
    }

    Err(ApiError::invalid_backup_format(
        "expected a backup document or a product array",
    ))
}
