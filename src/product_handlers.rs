// src/product_handlers.rs
use actix_web::{web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::audit::{self, ChangeSet};
use crate::error::{ApiError, ApiResult};
use crate::expiration::{self, local_today, ExpirationStatus};
use crate::filters::{self, ProductFilter};
use crate::handlers::{persist_and_push, ApiResponse};
use crate::inventory::BatchRemoval;
use crate::knowledge;
use crate::models::{CreateProductRequest, Product, UpdateProductRequest};
use crate::validator::validate_product_payload;
use crate::AppState;

// ==================== LISTING ====================

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub window: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
}

impl ProductQuery {
    fn to_filter(&self) -> ProductFilter {
        ProductFilter::from_params(
            self.search.as_deref(),
            self.category.as_deref(),
            self.window.as_deref(),
            self.status.as_deref(),
            self.sort.as_deref(),
        )
    }
}

/// Product decorated with the display fields the client renders on every
/// card: urgency classification, nearest expiration and total stock.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub nearest_expiration: Option<NaiveDate>,
    pub days_until_expiration: Option<i64>,
    pub expiration_status: Option<ExpirationStatus>,
    pub total_quantity: u64,
}

impl ProductView {
    pub fn build(product: Product, today: NaiveDate) -> Self {
        let nearest = expiration::nearest_expiration(&product);
        let diff_days = nearest.map(|date| expiration::days_until(today, date));
        Self {
            nearest_expiration: nearest,
            days_until_expiration: diff_days,
            expiration_status: diff_days.map(expiration::classify),
            total_quantity: product.total_quantity(),
            product,
        }
    }
}

pub async fn get_products(
    state: web::Data<Arc<AppState>>,
    query: web::Query<ProductQuery>,
) -> ApiResult<HttpResponse> {
    let today = local_today();
    let filter = query.to_filter();

    let products = {
        let inventory = state.inventory.read().unwrap();
        filters::apply(&inventory.products, &filter, today)
    };

    let views: Vec<ProductView> = products
        .into_iter()
        .map(|p| ProductView::build(p, today))
        .collect();
    Ok(HttpResponse::Ok().json(ApiResponse::success(views)))
}

pub async fn get_product(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let product_id = path.into_inner();
    let product = state
        .inventory
        .read()
        .unwrap()
        .product(&product_id)
        .cloned()
        .ok_or_else(|| ApiError::product_not_found(&product_id))?;

    let view = ProductView::build(product, local_today());
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

// ==================== MUTATIONS ====================

pub async fn create_product(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateProductRequest>,
) -> ApiResult<HttpResponse> {
    let request = request.into_inner();
    request.validate()?;

    let today = local_today();
    let checked = validate_product_payload(request.barcode.as_deref(), &request.batches, today)?;
    for (field, warnings) in &checked.warnings {
        log::warn!("{}: {}", field, warnings.join(", "));
    }

    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: request.name.clone(),
        brand: request.brand,
        barcode: request
            .barcode
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty()),
        category: request.category,
        image_url: request.image_url,
        added_at: Utc::now(),
        batches: request.batches.into_iter().map(|b| b.into_batch()).collect(),
    };

    let mut cs = ChangeSet::new();
    cs.created("name", &product.name);
    if let Some(ref v) = product.brand {
        cs.created("brand", v);
    }
    if let Some(ref v) = product.barcode {
        cs.created("barcode", v);
    }
    cs.created("batches", &product.batches.len().to_string());

    let next = {
        let mut inventory = state.inventory.write().unwrap();
        *inventory = inventory.with_product(product.clone());
        inventory.clone()
    };
    persist_and_push(&state, &next);
    audit::record("create", "product", &product.id, &cs.to_description());

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        ProductView::build(product, today),
        "Product created successfully".to_string(),
    )))
}

pub async fn update_product(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    request: web::Json<UpdateProductRequest>,
) -> ApiResult<HttpResponse> {
    let product_id = path.into_inner();
    let request = request.into_inner();
    request.validate()?;

    let today = local_today();
    let existing = state
        .inventory
        .read()
        .unwrap()
        .product(&product_id)
        .cloned()
        .ok_or_else(|| ApiError::product_not_found(&product_id))?;

    if let Some(ref batches) = request.batches {
        validate_product_payload(request.barcode.as_deref(), batches, today)?;
    } else if let Some(ref barcode) = request.barcode {
        crate::validator::validate_barcode(barcode.trim())?;
    }

    let mut cs = ChangeSet::new();
    let mut updated = existing.clone();
    if let Some(name) = request.name {
        cs.add("name", &existing.name, &name);
        updated.name = name;
    }
    if let Some(brand) = request.brand {
        cs.add_opt("brand", &existing.brand, &Some(brand.clone()));
        updated.brand = Some(brand);
    }
    if let Some(barcode) = request.barcode {
        let barcode = barcode.trim().to_string();
        cs.add_opt("barcode", &existing.barcode, &Some(barcode.clone()));
        updated.barcode = Some(barcode).filter(|b| !b.is_empty());
    }
    if let Some(category) = request.category {
        cs.add_opt("category", &existing.category, &Some(category.clone()));
        updated.category = Some(category);
    }
    if let Some(image_url) = request.image_url {
        updated.image_url = Some(image_url);
    }
    if let Some(batches) = request.batches {
        cs.add(
            "batches",
            &existing.batches.len().to_string(),
            &batches.len().to_string(),
        );
        updated.batches = batches.into_iter().map(|b| b.into_batch()).collect();
    }

    let next = {
        let mut inventory = state.inventory.write().unwrap();
        *inventory = inventory.with_product(updated.clone());
        inventory.clone()
    };
    persist_and_push(&state, &next);

    let description = if cs.has_changes() {
        cs.to_description()
    } else {
        "no field changes".to_string()
    };
    audit::record("edit", "product", &product_id, &description);

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        ProductView::build(updated, today),
        "Product updated successfully".to_string(),
    )))
}

pub async fn delete_product(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let product_id = path.into_inner();

    let (next, name) = {
        let mut inventory = state.inventory.write().unwrap();
        let name = inventory
            .product(&product_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| ApiError::product_not_found(&product_id))?;
        let (next, _removed) = inventory.without_product(&product_id);
        *inventory = next.clone();
        (next, name)
    };
    persist_and_push(&state, &next);

    let mut cs = ChangeSet::new();
    cs.deleted("name", &name);
    audit::record("delete", "product", &product_id, &cs.to_description());

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "id": product_id }),
        "Product and all its batches deleted".to_string(),
    )))
}

pub async fn delete_batch(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (product_id, batch_id) = path.into_inner();

    let (next, outcome) = {
        let mut inventory = state.inventory.write().unwrap();
        if inventory.product(&product_id).is_none() {
            return Err(ApiError::product_not_found(&product_id));
        }
        let (next, outcome) = inventory.without_batch(&product_id, &batch_id);
        if outcome == BatchRemoval::NotFound {
            return Err(ApiError::batch_not_found(&batch_id));
        }
        *inventory = next.clone();
        (next, outcome)
    };
    persist_and_push(&state, &next);

    let message = match outcome {
        BatchRemoval::ProductRemoved => {
            audit::record(
                "delete",
                "batch",
                &batch_id,
                "last batch; product removed with it",
            );
            "Last batch deleted; product removed".to_string()
        }
        _ => {
            audit::record("delete", "batch", &batch_id, "");
            "Batch deleted".to_string()
        }
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({
            "product_id": product_id,
            "batch_id": batch_id,
            "product_removed": outcome == BatchRemoval::ProductRemoved,
        }),
        message,
    )))
}

// ==================== BARCODE MEMORY ====================

pub async fn get_barcode_memory(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let memory = {
        let inventory = state.inventory.read().unwrap();
        knowledge::effective_memory(&inventory.barcode_db)
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(memory)))
}

pub async fn resolve_barcode(
    state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let code = path.into_inner();
    let entry = {
        let inventory = state.inventory.read().unwrap();
        knowledge::resolve(&code, &inventory.barcode_db)
    }
    .ok_or_else(|| ApiError::barcode_not_found(&code))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use std::sync::RwLock;

    use crate::config::Config;
    use crate::inventory::Inventory;
    use crate::store::Store;
    use crate::sync::SyncService;

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState {
            inventory: RwLock::new(Inventory::default()),
            store: Store::open(dir).unwrap(),
            sync: Arc::new(SyncService::new()),
            lookup: None,
            config: Config::default(),
        })
    }

    #[actix_web::test]
    async fn test_product_crud_flow() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/products", web::post().to(create_product))
                .route("/products", web::get().to(get_products))
                .route("/products/{id}", web::put().to(update_product))
                .route(
                    "/products/{id}/batches/{batch_id}",
                    web::delete().to(delete_batch),
                )
                .route("/barcodes/{code}", web::get().to(resolve_barcode)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(serde_json::json!({
                "name": "Milk",
                "brand": "Acme",
                "barcode": "789100010010",
                "batches": [{"expiration_date": "2999-01-01", "quantity": 2}]
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        let product_id = body["data"]["id"].as_str().unwrap().to_string();
        let batch_id = body["data"]["batches"][0]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["expiration_status"], "GOOD");
        assert_eq!(body["data"]["total_quantity"], 2);

        // Saving with a barcode populates the memory used for auto-fill.
        let req = test::TestRequest::get()
            .uri("/barcodes/789100010010")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "Milk");
        assert_eq!(body["data"]["brand"], "Acme");

        let req = test::TestRequest::get()
            .uri("/products?status=GOOD&search=mil")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::put()
            .uri(&format!("/products/{}", product_id))
            .set_json(serde_json::json!({"name": "Whole milk"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "Whole milk");

        // Deleting the only batch removes the product entirely.
        let req = test::TestRequest::delete()
            .uri(&format!("/products/{}/batches/{}", product_id, batch_id))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["product_removed"], true);
        assert!(state.inventory.read().unwrap().products.is_empty());

        // The mutation was persisted through the store as well.
        assert!(state
            .store
            .load_products(local_today())
            .is_empty());
    }

    #[actix_web::test]
    async fn test_create_rejects_invalid_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/products", web::post().to(create_product)),
        )
        .await;

        // No batches at all.
        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(serde_json::json!({"name": "Milk", "batches": []}))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), 422);

        // Barcode with letters.
        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(serde_json::json!({
                "name": "Milk",
                "barcode": "not-a-code",
                "batches": [{"expiration_date": "2999-01-01", "quantity": 1}]
            }))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), 422);

        assert!(state.inventory.read().unwrap().products.is_empty());
    }

    #[actix_web::test]
    async fn test_missing_product_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/products/{id}", web::get().to(get_product)),
        )
        .await;

        let req = test::TestRequest::get().uri("/products/nope").to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), 404);
    }
}
