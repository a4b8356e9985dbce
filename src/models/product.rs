// src/models/product.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use super::batch::{Batch, BatchInput};

// ==================== PRODUCT ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
    pub batches: Vec<Batch>,
}

impl Product {
    pub fn total_quantity(&self) -> u64 {
        self.batches.iter().map(|b| u64::from(b.quantity)).sum()
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(max = 255, message = "Brand cannot exceed 255 characters"))]
    pub brand: Option<String>,

    #[validate(length(max = 50, message = "Barcode cannot exceed 50 characters"))]
    pub barcode: Option<String>,

    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 2048, message = "Image URL cannot exceed 2048 characters"))]
    pub image_url: Option<String>,

    #[validate(length(min = 1, message = "Product must have at least one batch"), nested)]
    pub batches: Vec<BatchInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 255, message = "Brand cannot exceed 255 characters"))]
    pub brand: Option<String>,

    #[validate(length(max = 50, message = "Barcode cannot exceed 50 characters"))]
    pub barcode: Option<String>,

    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 2048, message = "Image URL cannot exceed 2048 characters"))]
    pub image_url: Option<String>,

    #[validate(length(min = 1, message = "Product must have at least one batch"), nested)]
    pub batches: Option<Vec<BatchInput>>,
}
