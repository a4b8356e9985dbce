// src/sync_handlers.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::audit;
use crate::backup;
use crate::error::{ApiError, ApiResult};
use crate::expiration::local_today;
use crate::handlers::{persist_and_push, ApiResponse};
use crate::inventory::Inventory;
use crate::sync::DriveClient;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ConnectRequest {
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClientIdRequest {
    #[validate(length(min = 1, max = 255, message = "Client ID must be between 1 and 255 characters"))]
    pub client_id: String,
}

/// Opens a cloud session and probes for an existing remote snapshot. The
/// probe result lets the client ask the user whether to restore before
/// anything overwrites local state.
pub async fn connect(
    state: web::Data<Arc<AppState>>,
    request: web::Json<ConnectRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let client = DriveClient::new(
        &state.config.sync.api_base,
        request.access_token.trim(),
        &state.config.sync.backup_filename,
        state.config.sync.timeout_seconds,
    )?;
    let probe = state.sync.connect(client).await?;

    log::info!(
        "Cloud session connected (remote snapshot: {})",
        if probe.snapshot_found { "found" } else { "none" }
    );
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        probe,
        "Cloud session connected".to_string(),
    )))
}

/// Explicit, user-confirmed restore: replaces local state with the remote
/// snapshot.
pub async fn restore(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let payload = state.sync.restore().await?;
    let (products, barcode_db) = backup::import_snapshot(payload, local_today())?;
    let counts = (products.len(), barcode_db.len());

    let next = Inventory::from_snapshot(products, barcode_db);
    {
        let mut inventory = state.inventory.write().unwrap();
        *inventory = next.clone();
    }
    persist_and_push(&state, &next);
    audit::record(
        "restore",
        "backup",
        "",
        &format!("cloud snapshot: {} products, {} barcode entries", counts.0, counts.1),
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "products": counts.0, "barcode_entries": counts.1 }),
        "Cloud snapshot restored; previous state replaced".to_string(),
    )))
}

pub async fn disconnect(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    state.sync.disconnect();
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Cloud session closed".to_string(),
    )))
}

pub async fn status(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(state.sync.status())))
}

// ==================== CLIENT ID ====================

pub async fn get_client_id(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let client_id = state
        .store
        .load_client_id()
        .ok_or_else(|| ApiError::NotFound("No cloud client ID configured".to_string()))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(client_id)))
}

pub async fn set_client_id(
    state: web::Data<Arc<AppState>>,
    request: web::Json<ClientIdRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;
    state.store.save_client_id(request.client_id.trim());
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "Cloud client ID saved".to_string(),
    )))
}
