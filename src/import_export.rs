// src/import_export.rs
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use std::sync::Arc;

use crate::audit;
use crate::backup;
use crate::error::{ApiError, ApiResult};
use crate::expiration::local_today;
use crate::handlers::{persist_and_push, ApiResponse};
use crate::inventory::Inventory;
use crate::AppState;

const BACKUP_EXPORT_FILENAME: &str = "validade_backup.json";
const MAX_BACKUP_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ==================== BACKUP EXPORT/IMPORT ====================

pub async fn export_backup(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let document = {
        let inventory = state.inventory.read().unwrap();
        backup::export_snapshot(&inventory)
    };

    let body = serde_json::to_vec_pretty(&document)
        .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("application/json; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", BACKUP_EXPORT_FILENAME),
        ))
        .body(body))
}

fn apply_import(
    state: &AppState,
    payload: serde_json::Value,
) -> Result<(usize, usize), ApiError> {
    let (products, barcode_db) = backup::import_snapshot(payload, local_today())?;
    let counts = (products.len(), barcode_db.len());

    // Import replaces the whole state, no merge semantics.
    let next = Inventory::from_snapshot(products, barcode_db);
    {
        let mut inventory = state.inventory.write().unwrap();
        *inventory = next.clone();
    }
    persist_and_push(state, &next);
    Ok(counts)
}

pub async fn import_backup(
    state: web::Data<Arc<AppState>>,
    payload: web::Json<serde_json::Value>,
) -> ApiResult<HttpResponse> {
    let (products, barcodes) = apply_import(&state, payload.into_inner())?;
    audit::record(
        "import",
        "backup",
        "",
        &format!("{} products, {} barcode entries", products, barcodes),
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "products": products, "barcode_entries": barcodes }),
        "Backup restored; previous state replaced".to_string(),
    )))
}

pub async fn import_backup_file(
    state: web::Data<Arc<AppState>>,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut raw: Vec<u8> = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {}", e)))?;
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
            if raw.len() + chunk.len() > MAX_BACKUP_UPLOAD_BYTES {
                return Err(ApiError::BadRequest("Backup file too large".to_string()));
            }
            raw.extend_from_slice(&chunk);
        }
    }

    if raw.is_empty() {
        return Err(ApiError::BadRequest("Empty backup upload".to_string()));
    }

    let value: serde_json::Value = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::invalid_backup_format(&e.to_string()))?;

    let (products, barcodes) = apply_import(&state, value)?;
    audit::record(
        "import",
        "backup",
        "",
        &format!("file upload: {} products, {} barcode entries", products, barcodes),
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "products": products, "barcode_entries": barcodes }),
        "Backup restored; previous state replaced".to_string(),
    )))
}

// ==================== CSV EXPORT ====================

pub async fn export_products_csv(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let products = state.inventory.read().unwrap().products.clone();
    let today = local_today();

    let mut csv_data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut csv_data);

        writer
            .write_record([
                "Name",
                "Brand",
                "Category",
                "Barcode",
                "Batches",
                "Total Quantity",
                "Nearest Expiration",
                "Status",
            ])
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;

        for product in products {
            let nearest = crate::expiration::nearest_expiration(&product);
            let status = crate::expiration::product_status(&product, today);
            writer
                .write_record([
                    product.name.clone(),
                    product.brand.clone().unwrap_or_default(),
                    product.category.clone().unwrap_or_default(),
                    product.barcode.clone().unwrap_or_default(),
                    product.batches.len().to_string(),
                    product.total_quantity().to_string(),
                    nearest.map(|d| d.to_string()).unwrap_or_default(),
                    status.map(|s| s.to_string()).unwrap_or_default(),
                ])
                .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    }

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(("Content-Disposition", "attachment; filename=\"products.csv\""))
        .body(csv_data))
}

// ==================== CLEAR ALL ====================

pub async fn clear_all(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let next = Inventory::cleared();
    {
        let mut inventory = state.inventory.write().unwrap();
        *inventory = next.clone();
    }
    persist_and_push(&state, &next);
    audit::record("clear", "inventory", "", "all products and barcode memory erased");

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        (),
        "All products and barcode memory cleared".to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use chrono::Utc;
    use std::sync::RwLock;

    use crate::config::Config;
    use crate::models::{Batch, Product};
    use crate::store::Store;
    use crate::sync::SyncService;

    fn seeded_state(dir: &std::path::Path) -> Arc<AppState> {
        let product = Product {
            id: "p1".to_string(),
            name: "Milk".to_string(),
            brand: None,
            barcode: Some("789100010010".to_string()),
            category: Some("Dairy".to_string()),
            image_url: None,
            added_at: Utc::now(),
            batches: vec![Batch {
                id: "b1".to_string(),
                expiration_date: "2999-01-01".parse().unwrap(),
                quantity: 1,
                lot_number: None,
            }],
        };
        Arc::new(AppState {
            inventory: RwLock::new(Inventory::default().with_product(product)),
            store: Store::open(dir).unwrap(),
            sync: Arc::new(SyncService::new()),
            lookup: None,
            config: Config::default(),
        })
    }

    #[actix_web::test]
    async fn test_export_then_reimport_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/backup/export", web::get().to(export_backup))
                .route("/backup/import", web::post().to(import_backup)),
        )
        .await;

        let req = test::TestRequest::get().uri("/backup/export").to_request();
        let response = test::call_service(&app, req).await;
        assert!(response
            .headers()
            .get("Content-Disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("attachment"));
        let exported = test::read_body(response).await;
        let document: serde_json::Value = serde_json::from_slice(&exported).unwrap();
        assert_eq!(document["version"], crate::models::BACKUP_VERSION);

        let before = state.inventory.read().unwrap().clone();
        let req = test::TestRequest::post()
            .uri("/backup/import")
            .set_json(&document)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(*state.inventory.read().unwrap(), before);
    }

    #[actix_web::test]
    async fn test_legacy_array_import_replaces_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/backup/import", web::post().to(import_backup)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/backup/import")
            .set_json(serde_json::json!([
                {"name": "Old rice", "expirationDate": "2030-05-01"}
            ]))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["products"], 1);
        assert_eq!(body["data"]["barcode_entries"], 0);

        let inventory = state.inventory.read().unwrap();
        assert_eq!(inventory.products.len(), 1);
        assert_eq!(inventory.products[0].name, "Old rice");
        // Legacy imports reset the barcode memory.
        assert!(inventory.barcode_db.is_empty());
    }

    #[actix_web::test]
    async fn test_malformed_import_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/backup/import", web::post().to(import_backup)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/backup/import")
            .set_json(serde_json::json!({"version": "1.4.0"}))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), 400);
        assert_eq!(state.inventory.read().unwrap().products.len(), 1);
    }

    #[actix_web::test]
    async fn test_clear_all_wipes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/backup/clear", web::post().to(clear_all)),
        )
        .await;

        let req = test::TestRequest::post().uri("/backup/clear").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let inventory = state.inventory.read().unwrap();
        assert!(inventory.products.is_empty());
        assert!(inventory.barcode_db.is_empty());
    }

    #[actix_web::test]
    async fn test_csv_export_headers() {
        let dir = tempfile::tempdir().unwrap();
        let state = seeded_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/products/export", web::get().to(export_products_csv)),
        )
        .await;

        let req = test::TestRequest::get().uri("/products/export").to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "text/csv; charset=utf-8"
        );
        let body = test::read_body(response).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Name,Brand,Category,Barcode"));
        assert!(text.contains("Milk"));
    }
}
