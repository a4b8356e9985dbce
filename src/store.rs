// src/store.rs - Local key-value persistence adapter
//
// State lives in a data directory as one JSON document per fixed key. Reads
// never fail: missing or corrupt data yields the empty value. Writes are
// logged on failure and never raised to the caller.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::migrate;
use crate::models::{BarcodeMemory, Product};

const PRODUCTS_KEY: &str = "products.json";
const BARCODES_KEY: &str = "barcodes.json";
const CLIENT_ID_KEY: &str = "sync_client_id.json";

#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.data_dir.join(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to read {}: {}", path.display(), e);
                }
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Corrupt document under {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_key<T: Serialize>(&self, key: &str, value: &T) {
        let path = self.data_dir.join(key);
        let result = serde_json::to_vec_pretty(value)
            .map_err(anyhow::Error::from)
            .and_then(|raw| fs::write(&path, raw).map_err(anyhow::Error::from));

        if let Err(e) = result {
            log::error!("Failed to save {}: {}", path.display(), e);
        }
    }

    /// Loads the product collection, running every record through the
    /// versioned loader. `today` anchors the synthetic batch assigned to
    /// repaired zero-batch records.
    pub fn load_products(&self, today: NaiveDate) -> Vec<Product> {
        let values: Vec<serde_json::Value> = self.read_key(PRODUCTS_KEY).unwrap_or_default();
        migrate::canonical_products(values, today)
    }

    pub fn save_products(&self, products: &[Product]) {
        self.write_key(PRODUCTS_KEY, &products);
    }

    pub fn load_barcode_memory(&self) -> BarcodeMemory {
        self.read_key(BARCODES_KEY).unwrap_or_default()
    }

    pub fn save_barcode_memory(&self, memory: &BarcodeMemory) {
        self.write_key(BARCODES_KEY, memory);
    }

    pub fn load_client_id(&self) -> Option<String> {
        self.read_key::<String>(CLIENT_ID_KEY)
            .filter(|id| !id.trim().is_empty())
    }

    pub fn save_client_id(&self, client_id: &str) {
        self.write_key(CLIENT_ID_KEY, &client_id);
    }

    /// Readiness probe: the store is healthy when its directory accepts
    /// writes.
    pub fn is_writable(&self) -> bool {
        let probe = self.data_dir.join(".probe");
        match fs::write(&probe, b"ok") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                true
            }
            Err(_) => false,
        }
    }
}
