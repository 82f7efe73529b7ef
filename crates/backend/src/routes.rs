use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, system};

/// Запас сверх лимита файла на остальные поля multipart
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Конфигурация всех роутов приложения
pub fn configure_routes(max_upload_bytes: usize) -> Router {
    let import_routes = Router::new()
        .route("/api/import/meta", get(handlers::u601_import_csv::meta))
        .route("/api/import/auto-map", post(handlers::u601_import_csv::auto_map))
        .route("/api/import/preview", post(handlers::u601_import_csv::preview))
        .route("/api/import/:entity_type", post(handlers::u601_import_csv::import))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD_BYTES))
        .layer(middleware::from_fn(system::auth::middleware::require_auth));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(import_routes)
}
