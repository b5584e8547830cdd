pub mod config;
pub mod models;
pub mod repositories;
pub mod services;
pub mod handlers;
pub mod middleware;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::HeaderValue,
    middleware::{self as axum_middleware, Next},
    routing::{delete, get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use config::AppConfig;
use handlers::{
    import::{
        cancel_session, commit, get_fields, get_session, select_sheet, submit_channels,
        submit_corrections, submit_mapping, upload,
    },
    sales::delete_sales,
};
use middleware::{identity_middleware, metrics_handler, metrics_middleware};
use services::WizardStore;
use utils::FileStorage;

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn create_app(config: AppConfig) -> anyhow::Result<Router> {
    let wizard_store = Arc::new(WizardStore::new(config.wizard_ttl_minutes));
    let file_storage = Arc::new(FileStorage::new(&config.upload_dir)?);

    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(header_val) => Some(header_val),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(cors_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT]);

    let app = Router::new()
        .nest(
            "/api/import",
            Router::new()
                .route("/fields", get(get_fields))
                .route("/upload", post(upload))
                .route("/sheet", post(select_sheet))
                .route("/mapping", post(submit_mapping))
                .route("/channels", post(submit_channels))
                .route("/corrections", post(submit_corrections))
                .route("/commit", post(commit))
                .route("/session", get(get_session))
                .route("/session", delete(cancel_session))
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(axum_middleware::from_fn(identity_middleware)),
        )
        .nest(
            "/api/sales",
            Router::new()
                .route("/", delete(delete_sales))
                .layer(axum_middleware::from_fn(identity_middleware)),
        )
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(metrics_middleware))
                .layer(axum::Extension(wizard_store))
                .layer(axum::Extension(file_storage))
                .layer(cors),
        )
        .with_state(config)
        .layer(axum_middleware::from_fn(|req: Request, next: Next| async move {
            tracing::info!("{} {}", req.method(), req.uri());
            let response = next.run(req).await;
            tracing::info!("Response status: {}", response.status());
            response
        }));

    Ok(app)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
