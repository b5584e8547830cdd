//! Route-level tests for the wizard steps that run without touching the
//! database (the pool is lazy, so the app constructs and serves fine; steps
//! that reach the catalog or the sales table are covered by the service
//! tests plus staging).

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use sellout_hub::config::{AppConfig, DatabaseConfig};
use sellout_hub::create_app;
use uuid::Uuid;

fn test_config() -> AppConfig {
    let database = DatabaseConfig {
        host: "localhost".to_string(),
        port: 5432,
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        database: "sellout_test".to_string(),
        ssl_mode: "prefer".to_string(),
    };
    let database_pool = sqlx::PgPool::connect_lazy(&database.connection_string()).unwrap();

    AppConfig {
        database,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        database_pool,
        upload_dir: std::env::temp_dir()
            .join(format!("sellout-api-{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string(),
        sales_channels: vec![
            "Retail".to_string(),
            "Ecommerce".to_string(),
            "Traditional".to_string(),
        ],
        wizard_ttl_minutes: 60,
    }
}

fn server() -> TestServer {
    TestServer::new(create_app(test_config()).unwrap()).unwrap()
}

fn as_user(name: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-auth-user"),
        HeaderValue::from_static(name),
    )
}

fn csv_upload(content: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content.as_bytes().to_vec())
            .file_name("ventas.csv")
            .mime_type("text/csv"),
    )
}

const REPORT_CSV: &str = "Codigo,Fecha,Venta Costo,Cliente,Canal\n\
                          A1,2025-01-02,\"1.234,56\",501,MODERNO\n\
                          A2,2025-01-03,99,502,feria\n";

#[tokio::test]
async fn health_is_public() {
    let server = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn metrics_are_exposed() {
    let server = server();
    let response = server.get("/metrics").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn import_routes_require_identity() {
    let server = server();
    let response = server.get("/api/import/fields").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fields_describe_the_internal_schema() {
    let server = server();
    let (name, value) = as_user("tester");
    let response = server.get("/api/import/fields").add_header(name, value).await;
    response.assert_status_ok();

    let fields: serde_json::Value = response.json();
    let fields = fields.as_array().unwrap();
    assert_eq!(fields.len(), 9);

    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f["required"].as_bool().unwrap())
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(required, vec!["sku", "cost_total", "sale_date", "client_code"]);
}

#[tokio::test]
async fn upload_extracts_headers_from_csv() {
    let server = server();
    let (name, value) = as_user("tester");

    let response = server
        .post("/api/import/upload")
        .add_header(name, value)
        .multipart(csv_upload(REPORT_CSV))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "headers_extracted");
    assert_eq!(
        body["headers"],
        serde_json::json!(["Codigo", "Fecha", "Venta Costo", "Cliente", "Canal"])
    );
    assert!(body.get("sheets").is_none());
}

#[tokio::test]
async fn mapping_missing_required_field_is_rejected() {
    let server = server();
    let (name, value) = as_user("tester");

    server
        .post("/api/import/upload")
        .add_header(name.clone(), value.clone())
        .multipart(csv_upload(REPORT_CSV))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/import/mapping")
        .add_header(name, value)
        .json(&serde_json::json!({
            "sku": "Codigo",
            "cost_total": "Venta Costo",
            "sale_date": "Fecha"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Client Code"));
}

#[tokio::test]
async fn mapping_with_channel_column_returns_distinct_raw_channels() {
    let server = server();
    let (name, value) = as_user("tester");

    server
        .post("/api/import/upload")
        .add_header(name.clone(), value.clone())
        .multipart(csv_upload(REPORT_CSV))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/import/mapping")
        .add_header(name, value)
        .json(&serde_json::json!({
            "sku": "Codigo",
            "cost_total": "Venta Costo",
            "sale_date": "Fecha",
            "client_code": "Cliente",
            "channel": "Canal"
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "channels_extracted");
    assert_eq!(body["channels"], serde_json::json!(["MODERNO", "feria"]));
    assert_eq!(body["ready_to_commit"], false);
}

#[tokio::test]
async fn sheet_selection_only_applies_to_workbooks() {
    let server = server();
    let (name, value) = as_user("tester");

    server
        .post("/api/import/upload")
        .add_header(name.clone(), value.clone())
        .multipart(csv_upload(REPORT_CSV))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/import/sheet")
        .add_header(name, value)
        .json(&serde_json::json!({ "sheet": "Sheet1" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_drops_the_session() {
    let server = server();
    let (name, value) = as_user("tester");

    server
        .post("/api/import/upload")
        .add_header(name.clone(), value.clone())
        .multipart(csv_upload(REPORT_CSV))
        .await
        .assert_status_ok();

    let response = server
        .delete("/api/import/session")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "cancelled");

    let response = server.get("/api/import/session").add_header(name, value).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_introspection_reflects_progress() {
    let server = server();
    let (name, value) = as_user("tester");

    let no_session = server
        .get("/api/import/session")
        .add_header(name.clone(), value.clone())
        .await;
    no_session.assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/import/upload")
        .add_header(name.clone(), value.clone())
        .multipart(csv_upload(REPORT_CSV))
        .await
        .assert_status_ok();

    let response = server.get("/api/import/session").add_header(name, value).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "headers_extracted");
    assert_eq!(body["original_filename"], "ventas.csv");
}
