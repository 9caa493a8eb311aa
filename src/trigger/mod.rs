//! Server-side trigger: push an event onto a named channel from an
//! ordinary request handler, skipping the subscription handshake.

use crate::error::{AppError, AppResult};
use crate::models::{ChannelName, ChannelType};
use crate::provider::Provider;
use crate::router::{RouteKind, RouterContract};
use std::sync::Arc;
use tracing::info;

/// Fire-and-forget broadcaster bound to the shared router contract.
pub struct TriggerClient {
    provider: Arc<dyn Provider>,
    contract: RouterContract,
}

impl TriggerClient {
    pub fn new(provider: Arc<dyn Provider>, contract: RouterContract) -> Self {
        Self { provider, contract }
    }

    /// Broadcast `event` with `data` onto the channel for `route`/`id`.
    pub async fn trigger(
        &self,
        route: &str,
        id: Option<&str>,
        event: &str,
        data: serde_json::Value,
    ) -> AppResult<()> {
        let kind = self
            .contract
            .kind(route)
            .ok_or_else(|| AppError::RouteNotFound(format!("route `{}` not in router", route)))?;
        let channel_type = match kind {
            RouteKind::Presence => ChannelType::Presence,
            RouteKind::Fire => ChannelType::Public,
        };
        let name = ChannelName::new(channel_type, route, id.map(String::from)).wire();
        self.provider.trigger(&name, event, data).await?;
        info!(channel = %name, event = %event, "triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChannelAuth, PresenceData};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        triggers: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn authorize_channel(
            &self,
            _socket_id: &str,
            _channel_name: &str,
            _presence: Option<&PresenceData>,
        ) -> AppResult<ChannelAuth> {
            unreachable!("trigger never authorizes")
        }

        async fn trigger(
            &self,
            channel: &str,
            event: &str,
            _data: serde_json::Value,
        ) -> AppResult<()> {
            self.triggers
                .lock()
                .unwrap()
                .push((channel.to_string(), event.to_string()));
            Ok(())
        }

        fn verify_webhook(&self, _signature: &str, _body: &[u8]) -> bool {
            false
        }
    }

    fn contract() -> RouterContract {
        use crate::router::{Route, Router};
        Router::<()>::builder()
            .route("lobby", Route::fire())
            .unwrap()
            .build()
            .contract()
    }

    #[tokio::test]
    async fn trigger_builds_wire_name_from_contract() {
        let provider = Arc::new(RecordingProvider::default());
        let client = TriggerClient::new(provider.clone(), contract());
        client
            .trigger("lobby", Some("p9"), "countdown", serde_json::json!({ "t": 3 }))
            .await
            .unwrap();
        let triggers = provider.triggers.lock().unwrap();
        assert_eq!(triggers[0], ("lobby-p9".to_string(), "countdown".to_string()));
    }

    #[tokio::test]
    async fn unknown_route_is_rejected() {
        let provider = Arc::new(RecordingProvider::default());
        let client = TriggerClient::new(provider.clone(), contract());
        let err = client
            .trigger("nope", None, "x", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RouteNotFound(_)));
        assert!(provider.triggers.lock().unwrap().is_empty());
    }
}
