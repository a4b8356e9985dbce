// src/models/barcode.rs
use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// Category assigned when a product is remembered without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Remembered product identity for a barcode, used to auto-fill future
/// entries sharing the same code.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BarcodeEntry {
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
}

pub type BarcodeMemory = HashMap<String, BarcodeEntry>;
