// src/models/mod.rs

pub mod backup;
pub mod barcode;
pub mod batch;
pub mod product;

pub use backup::*;
pub use barcode::*;
pub use batch::*;
pub use product::*;

use serde::Serialize;

// ==================== COMMON / SHARED ====================

/// Headline counters for the dashboard.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_products: i64,
    pub total_batches: i64,
    pub warning_products: i64,
    pub expired_products: i64,
}
