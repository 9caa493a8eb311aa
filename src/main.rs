//! Entry point: load config, wire a sample router, and run the server.

use async_trait::async_trait;
use axum::http::HeaderMap;
use prpc::handlers::{log_on_error, FnHandler};
use prpc::{
    create_app, AppError, AppResult, Config, ContextFactory, HostedProvider, PrpcState, Route,
    Router, WebhookHandlers,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use validator::Validate;

/// Per-request principal, stands in for the real session provider.
struct Session {
    user_id: String,
    user_name: String,
}

struct HeaderSessionFactory;

#[async_trait]
impl ContextFactory for HeaderSessionFactory {
    type Ctx = Session;

    async fn create(&self, headers: &HeaderMap) -> AppResult<Session> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        let user_id = get("x-session-user")
            .ok_or_else(|| AppError::Auth("no session".to_string()))?;
        let user_name = get("x-session-name").unwrap_or_else(|| "anonymous".to_string());
        Ok(Session { user_id, user_name })
    }
}

/// Member shape on the `game` presence channel.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct GameUser {
    id: String,
    #[validate(length(min = 1, max = 64))]
    name: String,
    is_host: bool,
}

fn build_router() -> AppResult<Router<Session>> {
    Ok(Router::builder()
        .route(
            "game",
            Route::presence::<GameUser>().auth(|session: Session, data: GameUser| async move {
                // The session decides identity; the client only proposes
                // the host flag.
                Ok(GameUser {
                    id: session.user_id,
                    name: session.user_name,
                    is_host: data.is_host,
                })
            }),
        )?
        .route("lobby", Route::fire())?
        .build())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = HostedProvider::shared(&config);
    let router = build_router().map_err(|e| anyhow::anyhow!("router: {}", e))?;

    let webhooks = WebhookHandlers::new()
        .on_presence(FnHandler(|event: prpc::models::WebhookEvent| async move {
            tracing::info!(event = %event.name, channel = %event.channel, "presence webhook");
            Ok(())
        }))
        .on_existence(FnHandler(|event: prpc::models::WebhookEvent| async move {
            tracing::info!(event = %event.name, channel = %event.channel, "existence webhook");
            Ok(())
        }));

    let state = PrpcState {
        router: Arc::new(router),
        provider,
        context: Arc::new(HeaderSessionFactory),
        on_error: log_on_error(),
        webhooks: Arc::new(webhooks),
    };

    let app = create_app(state);

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
