// libs/assistant-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::RuleBasedResponder;

pub fn assistant_routes(config: Arc<AppConfig>, responder: Arc<RuleBasedResponder>) -> Router {
    Router::new()
        .route("/chat", post(handlers::chat))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(responder)
}
