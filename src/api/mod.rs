//! HTTP surface: the controller webhook, the direct answer path and health.

pub mod handlers;

use actix_web::web;

use crate::error::AppError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::post().to(handlers::conversation_start))
        .route("/health", web::get().to(crate::health_check))
        .route(
            "/conversations/{conversation_id}/start",
            web::post().to(handlers::start_conversation),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            web::post().to(handlers::post_message),
        );
}

/// Rejected JSON bodies answer with the same error shape as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}
