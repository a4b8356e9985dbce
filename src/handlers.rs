// src/handlers.rs
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::backup;
use crate::error::ApiResult;
use crate::expiration::local_today;
use crate::inventory::Inventory;
use crate::AppState;

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
        }
    }
}

// ==================== PERSISTENCE STEP ====================

/// Explicit side-effecting step after every state update: write both
/// documents to the local store, then hand the snapshot to the sync service
/// for an opportunistic background push.
pub fn persist_and_push(state: &AppState, inventory: &Inventory) {
    state.store.save_products(&inventory.products);
    state.store.save_barcode_memory(&inventory.barcode_db);
    state
        .sync
        .clone()
        .push_background(backup::export_snapshot(inventory));
}

// ==================== DASHBOARD ====================

pub async fn get_dashboard_stats(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let stats = {
        let inventory = state.inventory.read().unwrap();
        inventory.stats(local_today())
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

pub async fn get_categories(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let categories = state.inventory.read().unwrap().categories();
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}
