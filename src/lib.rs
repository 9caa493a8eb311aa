//! Presence-channel RPC layer ("PRPC") over a hosted pub/sub provider.
//!
//! A typed server-side router doubles as the contract for real-time
//! channel event handlers: the server authorizes presence-channel
//! subscriptions against per-route resolvers, the client binds and sends
//! through the same route names, and provider webhooks reconcile
//! application state out of band.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod router;
pub mod trigger;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use handlers::{ContextFactory, ErrorEvent, PrpcState, WebhookHandlers};
pub use models::{ChannelName, ChannelType, Member};
pub use provider::{HostedProvider, Provider};
pub use router::{Route, Router, RouterContract};
pub use trigger::TriggerClient;

use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the API router (auth, webhook, health). Used by main and by
/// integration tests.
pub fn create_app<C: Send + Sync + 'static>(state: PrpcState<C>) -> axum::Router {
    axum::Router::new()
        .route("/prpc/auth", post(handlers::authorize::<C>))
        .route("/prpc/webhook", post(handlers::webhook::<C>))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
