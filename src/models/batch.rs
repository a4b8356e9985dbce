// src/models/batch.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::NaiveDate;

/// Lot label assigned to batches created by legacy-shape migration.
pub const DEFAULT_LOT_LABEL: &str = "Initial lot";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Batch {
    pub id: String,
    pub expiration_date: NaiveDate,
    pub quantity: u32,
    pub lot_number: Option<String>,
}

/// Batch payload inside create/update product requests. An `id` is kept when
/// the client sends one (editing an existing batch), generated otherwise.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct BatchInput {
    pub id: Option<String>,
    pub expiration_date: NaiveDate,
    #[validate(range(max = 1_000_000, message = "Quantity too large"))]
    pub quantity: u32,
    #[validate(length(max = 100, message = "Lot number cannot exceed 100 characters"))]
    pub lot_number: Option<String>,
}

impl BatchInput {
    pub fn into_batch(self) -> Batch {
        Batch {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            expiration_date: self.expiration_date,
            quantity: self.quantity,
            lot_number: self.lot_number,
        }
    }
}
