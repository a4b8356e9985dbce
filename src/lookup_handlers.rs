// src/lookup_handlers.rs
use actix_web::{web, HttpResponse};
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::handlers::ApiResponse;
use crate::lookup::{GeminiLookup, ProductLookup};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct BarcodeLookupRequest {
    #[validate(length(min = 1, max = 50, message = "Barcode must be between 1 and 50 characters"))]
    pub barcode: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImageLookupRequest {
    #[validate(length(min = 1, message = "Image payload is required"))]
    pub image_base64: String,
}

fn lookup_client(state: &AppState) -> Result<Arc<GeminiLookup>, ApiError> {
    state
        .lookup
        .clone()
        .ok_or_else(ApiError::lookup_unavailable)
}

pub async fn lookup_by_barcode(
    state: web::Data<Arc<AppState>>,
    request: web::Json<BarcodeLookupRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let client = lookup_client(&state)?;

    let suggestion = client.identify_by_barcode(request.barcode.trim()).await?;
    log::info!(
        "Lookup identified barcode {} as '{}'",
        request.barcode,
        suggestion.name
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success(suggestion)))
}

pub async fn lookup_by_image(
    state: web::Data<Arc<AppState>>,
    request: web::Json<ImageLookupRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    let client = lookup_client(&state)?;

    // Reject garbage before spending a model call on it.
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(request.image_base64.trim())
        .map_err(|_| ApiError::BadRequest("Image payload is not valid base64".to_string()))?;
    if decoded.is_empty() {
        return Err(ApiError::BadRequest("Image payload is empty".to_string()));
    }

    let suggestion = client.identify_by_image(request.image_base64.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(suggestion)))
}
