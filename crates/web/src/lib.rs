pub mod handlers;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{StatusCode, header},
};
use preview_sync_core::config::Config;
use preview_sync_github::GitHub;
use preview_sync_publish::PathLocks;
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::build_router;

/// GitHub caps webhook payloads at 25 MB.
const MAX_BODY_SIZE: usize = 25 * 1024 * 1024;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub github: Arc<GitHub>,
    pub locks: Arc<PathLocks>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let github = GitHub::new(&config.github)?;
        Ok(Self {
            config: Arc::new(config),
            github: Arc::new(github),
            locks: Arc::new(PathLocks::new()),
        })
    }
}

pub fn app(state: AppState) -> Router {
    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();
    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers.clone())
        .sensitive_response_headers(sensitive_headers)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(120),
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));
    let webhook_path = state.config.server.webhook_path.clone();
    build_router(&webhook_path).with_state(state).layer(middleware)
}
