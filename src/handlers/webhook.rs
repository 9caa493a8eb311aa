//! Provider webhook endpoint: verify the batch signature, then dispatch
//! each event to the handler registered for its category. One failing
//! handler never blocks the rest of the batch.

use crate::error::AppResult;
use crate::handlers::PrpcState;
use crate::models::{WebhookBatch, WebhookEvent};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

const HEADER_SIGNATURE: &str = "x-prpc-signature";

/// Coarse event category a handler registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookCategory {
    /// Membership churn on presence channels.
    Presence,
    /// Channel lifecycle: occupied, vacated.
    Existence,
}

impl WebhookCategory {
    pub fn of(event_name: &str) -> Self {
        match event_name {
            "member_added" | "member_removed" => WebhookCategory::Presence,
            _ => WebhookCategory::Existence,
        }
    }
}

/// Application callback for one webhook event. May mutate persistence
/// state (e.g. end a game when its host's membership is removed).
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, event: WebhookEvent) -> AppResult<()>;
}

/// Adapter so plain async closures can register as handlers.
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send,
{
    async fn handle(&self, event: WebhookEvent) -> AppResult<()> {
        (self.0)(event).await
    }
}

/// Registry of per-category handlers.
#[derive(Default)]
pub struct WebhookHandlers {
    presence: Option<Arc<dyn WebhookHandler>>,
    existence: Option<Arc<dyn WebhookHandler>>,
}

impl WebhookHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_presence(mut self, handler: impl WebhookHandler + 'static) -> Self {
        self.presence = Some(Arc::new(handler));
        self
    }

    pub fn on_existence(mut self, handler: impl WebhookHandler + 'static) -> Self {
        self.existence = Some(Arc::new(handler));
        self
    }

    fn for_category(&self, category: WebhookCategory) -> Option<&Arc<dyn WebhookHandler>> {
        match category {
            WebhookCategory::Presence => self.presence.as_ref(),
            WebhookCategory::Existence => self.existence.as_ref(),
        }
    }
}

/// Dispatch every event in the batch, isolating failures per event.
/// Returns how many handlers completed successfully.
pub async fn dispatch_batch(handlers: &WebhookHandlers, batch: WebhookBatch) -> usize {
    let mut handled = 0;
    for event in batch.events {
        let category = WebhookCategory::of(&event.name);
        let Some(handler) = handlers.for_category(category) else {
            debug!(event = %event.name, channel = %event.channel, "no handler registered");
            continue;
        };
        match handler.handle(event.clone()).await {
            Ok(()) => handled += 1,
            Err(e) => {
                warn!(event = %event.name, channel = %event.channel, error = %e, "webhook handler failed");
            }
        }
    }
    handled
}

/// POST /prpc/webhook — signed batch of provider events.
pub async fn webhook<C: Send + Sync + 'static>(
    State(state): State<PrpcState<C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if signature.is_empty() || !state.provider.verify_webhook(signature, &body) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let batch: WebhookBatch = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let handled = dispatch_batch(&state.webhooks, batch).await;
    debug!(handled, "webhook batch processed");
    StatusCode::OK.into_response()
}
