//! Presence channel authorization endpoint.
//!
//! Validates the inbound request, resolves the route, runs the route's
//! authorization resolver against a caller-supplied context, and returns
//! the provider's signed response verbatim. Everything past the initial
//! request validation fails closed: the error hook fires and the client
//! gets an empty response.

use crate::error::AppResult;
use crate::handlers::PrpcState;
use crate::models::{AuthRequest, ChannelName};
use crate::provider::PresenceData;
use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use std::sync::Arc;
use tracing::error;

/// Context passed to authorization resolvers, produced per request by a
/// caller-supplied factory wrapping the session/persistence collaborators.
#[async_trait]
pub trait ContextFactory: Send + Sync {
    type Ctx: Send + 'static;

    async fn create(&self, headers: &HeaderMap) -> AppResult<Self::Ctx>;
}

/// Payload handed to the error hook on any fail-closed authorization path.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub channel_name: String,
    pub message: String,
}

pub type OnError = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Default error hook: structured log line, nothing else.
pub fn log_on_error() -> OnError {
    Arc::new(|event| {
        error!(channel = %event.channel_name, message = %event.message, "channel authorization failed");
    })
}

/// POST /prpc/auth — authorize a socket onto a channel.
pub async fn authorize<C: Send + Sync + 'static>(
    State(state): State<PrpcState<C>>,
    headers: HeaderMap,
    Json(body): Json<AuthRequest>,
) -> Response {
    // Missing fields are a client bug, reported in-band without log noise.
    let socket_id = match body.socket_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(s) => s.to_string(),
        None => return bad_request("missing socket_id"),
    };
    let channel_name = match body.channel_name.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(s) => s.to_string(),
        None => return bad_request("missing channel_name"),
    };

    let parsed = match ChannelName::parse(&channel_name) {
        Ok(p) => p,
        Err(e) => return fail_closed(&state, &channel_name, e.to_string()),
    };

    let route = match state.router.get(parsed.route()) {
        Some(r) => r,
        None => {
            // Usually deploy skew between client and server route names.
            return fail_closed(
                &state,
                &channel_name,
                format!("route `{}` not found", parsed.route()),
            );
        }
    };

    // Nothing to authorize on a non-member route.
    if !route.is_presence() {
        return Json(serde_json::Value::Null).into_response();
    }

    let ctx = match state.context.create(&headers).await {
        Ok(ctx) => ctx,
        Err(e) => return fail_closed(&state, &channel_name, e.to_string()),
    };

    let payload = serde_json::Value::Object(body.payload);
    let user_info = match route.authorize(ctx, payload).await {
        Ok(info) => info,
        Err(e) => return fail_closed(&state, &channel_name, e.to_string()),
    };

    // A fresh opaque identity per authorization: stable application ids
    // are not exposed to other channel members.
    let presence = PresenceData {
        user_id: opaque_user_id(),
        user_info: Some(user_info),
    };

    match state
        .provider
        .authorize_channel(&socket_id, &channel_name, Some(&presence))
        .await
    {
        Ok(auth) => Json(auth).into_response(),
        Err(e) => fail_closed(&state, &channel_name, e.to_string()),
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn fail_closed<C>(state: &PrpcState<C>, channel_name: &str, message: String) -> Response {
    (state.on_error)(&ErrorEvent {
        channel_name: channel_name.to_string(),
        message,
    });
    StatusCode::FORBIDDEN.into_response()
}

/// Random numeric presence identity, minted per authorization.
pub(crate) fn opaque_user_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
