use actix_cors::Cors;
use actix_files::Files;
use actix_web::http::header;
use actix_web::{
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer,
};
use anyhow::Context;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Module declarations
mod audit;
mod backup;
mod config;
mod error;
mod expiration;
mod filters;
mod handlers;
mod import_export;
mod inventory;
mod knowledge;
mod lookup;
mod lookup_handlers;
mod migrate;
mod models;
mod monitoring;
mod product_handlers;
mod store;
mod sync;
mod sync_handlers;
pub mod validator;

use config::{load_config, Config, ReloadableConfig};
use inventory::Inventory;
use lookup::GeminiLookup;
use monitoring::{Metrics, RequestLogger};
use store::Store;
use sync::SyncService;

pub struct AppState {
    pub inventory: RwLock<Inventory>,
    pub store: Store,
    pub sync: Arc<SyncService>,
    pub lookup: Option<Arc<GeminiLookup>>,
    pub config: Config,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    // Setup logging
    setup_logging(&config)?;
    config.print_startup_info();

    // Open the local store and load state, repairing legacy shapes
    let store = Store::open(&config.storage.data_dir)?;
    let today = expiration::local_today();
    let inventory = Inventory::from_snapshot(store.load_products(today), store.load_barcode_memory());
    // Write the canonical shape back so repairs stick even if the process
    // dies before the first mutation.
    store.save_products(&inventory.products);
    log::info!(
        "Loaded {} products and {} remembered barcodes",
        inventory.products.len(),
        inventory.barcode_db.len()
    );

    let sync_service = Arc::new(SyncService::new());
    let lookup_client = GeminiLookup::from_config(&config.lookup).map(Arc::new);

    // Config hot reload
    config::start_hot_reload(ReloadableConfig::new(config.clone()));

    // Create app state
    let app_state = Arc::new(AppState {
        inventory: RwLock::new(inventory),
        store,
        sync: sync_service,
        lookup: lookup_client,
        config: config.clone(),
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    // Create metrics
    let metrics_arc = Arc::new(Metrics::new());

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&server_config.security.allowed_origins);
        let security_headers = setup_security_headers(&server_config.security);

        let app = App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(RequestLogger::new(metrics_arc.clone()))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(metrics_arc.clone()))
            .app_data(web::JsonConfig::default().limit(server_config.security.max_request_size))
            // Health check and metrics
            .service(
                web::scope("/health")
                    .route("", web::get().to(monitoring::health_check))
                    .route("/metrics", web::get().to(monitoring::metrics_endpoint))
                    .route("/ready", web::get().to(monitoring::readiness_check))
                    .route("/live", web::get().to(monitoring::liveness_check)),
            )
            // API endpoints
            .service(
                web::scope("/api/v1")
                    // Products
                    .service(
                        web::scope("/products")
                            .route("", web::get().to(product_handlers::get_products))
                            .route("", web::post().to(product_handlers::create_product))
                            .route("/categories", web::get().to(handlers::get_categories))
                            .route("/export", web::get().to(import_export::export_products_csv))
                            .route("/{id}", web::get().to(product_handlers::get_product))
                            .route("/{id}", web::put().to(product_handlers::update_product))
                            .route("/{id}", web::delete().to(product_handlers::delete_product))
                            .route(
                                "/{id}/batches/{batch_id}",
                                web::delete().to(product_handlers::delete_batch),
                            ),
                    )
                    // Barcode memory
                    .service(
                        web::scope("/barcodes")
                            .route("", web::get().to(product_handlers::get_barcode_memory))
                            .route("/{code}", web::get().to(product_handlers::resolve_barcode)),
                    )
                    // Dashboard
                    .service(
                        web::scope("/dashboard")
                            .route("/stats", web::get().to(handlers::get_dashboard_stats)),
                    )
                    // Backup
                    .service(
                        web::scope("/backup")
                            .route("/export", web::get().to(import_export::export_backup))
                            .route("/import", web::post().to(import_export::import_backup))
                            .route(
                                "/import/file",
                                web::post().to(import_export::import_backup_file),
                            )
                            .route("/clear", web::post().to(import_export::clear_all)),
                    )
                    // AI lookup
                    .service(
                        web::scope("/lookup")
                            .route("/barcode", web::post().to(lookup_handlers::lookup_by_barcode))
                            .route("/image", web::post().to(lookup_handlers::lookup_by_image)),
                    )
                    // Cloud sync
                    .service(
                        web::scope("/sync")
                            .route("/status", web::get().to(sync_handlers::status))
                            .route("/connect", web::post().to(sync_handlers::connect))
                            .route("/restore", web::post().to(sync_handlers::restore))
                            .route("/disconnect", web::post().to(sync_handlers::disconnect))
                            .route("/client-id", web::get().to(sync_handlers::get_client_id))
                            .route("/client-id", web::put().to(sync_handlers::set_client_id)),
                    ),
            );

        // Serve the web client when a static build is present
        if Path::new(&server_config.server.static_dir).exists() {
            app.service(
                Files::new("/", &server_config.server.static_dir).index_file("index.html"),
            )
        } else {
            app.route(
                "/",
                web::get().to(|| async { HttpResponse::Ok().body("validade API") }),
            )
        }
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive))
    .bind(&bind_address)?;

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.run().await.context("Server failed to run")?;

    Ok(())
}

// ==================== HELPER FUNCTIONS ====================

pub fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::USER_AGENT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH, header::CONTENT_DISPOSITION])
        .max_age(3600);

    let is_production = std::env::var("VALIDADE_ENV").as_deref() == Ok("production");

    if allowed_origins.contains(&"*".to_string()) {
        if is_production {
            // load_config already rejects this; keep the hard stop in case
            // the config was constructed another way.
            panic!("Cannot start server with wildcard CORS in production");
        }
        log::warn!("Using wildcard CORS (*) in development mode");
        cors = cors.allow_any_origin().allow_any_header().allow_any_method();
    } else {
        for origin in allowed_origins {
            if origin.is_empty() {
                continue;
            }
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.logging.level.as_str();
        tracing_subscriber::EnvFilter::new(level)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn setup_security_headers(config: &crate::config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}
