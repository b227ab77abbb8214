use axum::{
    Router,
    routing::{get, post},
};
use preview_sync_core::config::HEALTH_PATH;

use crate::AppState;

pub mod webhook;

pub fn build_router(webhook_path: &str) -> Router<AppState> {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(webhook_path, post(webhook::webhook))
}

async fn health() -> &'static str { "ok" }
