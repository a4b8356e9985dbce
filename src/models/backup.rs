// src/models/backup.rs
use serde::{Deserialize, Serialize};

use super::barcode::BarcodeMemory;
use super::product::Product;

/// Version tag written into every exported snapshot.
pub const BACKUP_VERSION: &str = "1.4.0";

/// Full exportable/importable state snapshot.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupDocument {
    pub products: Vec<Product>,
    #[serde(alias = "barcodeDb")]
    pub barcode_db: BarcodeMemory,
    pub version: String,
}
