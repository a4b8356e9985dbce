// src/validator.rs - Centralized validation module
use std::collections::HashMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::BatchInput;

lazy_static! {
    static ref BARCODE_REGEX: Regex = Regex::new(r"^\d{6,14}$").unwrap();
}

// ==================== VALIDATION RESULT ====================

#[derive(Debug, Default, Serialize)]
pub struct ValidationResult {
    pub errors: HashMap<String, Vec<String>>,
    pub warnings: HashMap<String, Vec<String>>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn to_api_error(&self) -> ApiError {
        let message = self
            .errors
            .iter()
            .map(|(field, errors)| format!("{}: {}", field, errors.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        ApiError::ValidationError(message)
    }

    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(self.to_api_error())
        }
    }
}

// ==================== FIELD VALIDATORS ====================

pub fn validate_barcode(barcode: &str) -> Result<(), ApiError> {
    if barcode.is_empty() {
        return Ok(());
    }
    if !BARCODE_REGEX.is_match(barcode) {
        return Err(ApiError::ValidationError(
            "Barcode must be 6 to 14 digits".to_string(),
        ));
    }
    Ok(())
}

/// Cross-field rules for product payloads, beyond what the derive-level
/// validators express. Past expiration dates are legal (that is the point of
/// the tracker) but produce a warning so the API can surface them.
pub fn validate_product_payload(
    barcode: Option<&str>,
    batches: &[BatchInput],
    today: NaiveDate,
) -> Result<ValidationResult, ApiError> {
    let mut result = ValidationResult::new();

    if let Some(barcode) = barcode {
        if let Err(e) = validate_barcode(barcode.trim()) {
            result.add_error("barcode", e.to_string());
        }
    }

    if batches.is_empty() {
        result.add_error("batches", "Product must have at least one batch");
    }

    for (idx, batch) in batches.iter().enumerate() {
        if batch.expiration_date < today {
            result.add_warning(
                format!("batches[{}].expiration_date", idx),
                "Expiration date is already in the past",
            );
        }
    }

    result.into_result()
}
