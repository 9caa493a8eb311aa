//! HTTP entry points: channel authorization and provider webhooks.

pub mod auth;
pub mod webhook;

pub use auth::{authorize, log_on_error, ContextFactory, ErrorEvent, OnError};
pub use webhook::{webhook, FnHandler, WebhookCategory, WebhookHandler, WebhookHandlers};

use crate::provider::Provider;
use crate::router::Router;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Shared state behind the PRPC endpoints.
pub struct PrpcState<C> {
    pub router: Arc<Router<C>>,
    pub provider: Arc<dyn Provider>,
    pub context: Arc<dyn ContextFactory<Ctx = C>>,
    pub on_error: OnError,
    pub webhooks: Arc<WebhookHandlers>,
}

impl<C> Clone for PrpcState<C> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            provider: self.provider.clone(),
            context: self.context.clone(),
            on_error: self.on_error.clone(),
            webhooks: self.webhooks.clone(),
        }
    }
}

/// GET /health — liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "prpc" })),
    )
}
