//! Client side: channel binders typed against the server router.

pub mod binder;
pub mod socket;
pub mod transport;

pub use binder::{Binding, ChannelBinder, SubscriptionStatus};
pub use socket::{ChannelEvent, ChannelHandle, SocketClient};
pub use transport::{HttpTransport, SendTransport};

use crate::error::{AppError, AppResult};
use crate::models::{ChannelName, ChannelType};
use crate::router::{RouteKind, RouterContract};
use std::sync::Arc;

/// Produces binders from route names: the explicit-registry replacement
/// for dynamic property dispatch. Presence routes get presence channels;
/// fire routes get public ones.
pub struct ChannelFactory {
    contract: RouterContract,
    client: Arc<dyn SocketClient>,
    transport: Arc<dyn SendTransport>,
}

impl ChannelFactory {
    pub fn new(
        contract: RouterContract,
        client: Arc<dyn SocketClient>,
        transport: Arc<dyn SendTransport>,
    ) -> Self {
        Self {
            contract,
            client,
            transport,
        }
    }

    pub fn channel(&self, route: &str, id: Option<&str>) -> AppResult<ChannelBinder> {
        let kind = self
            .contract
            .kind(route)
            .ok_or_else(|| AppError::RouteNotFound(format!("route `{}` not in router", route)))?;
        let channel_type = match kind {
            RouteKind::Presence => ChannelType::Presence,
            RouteKind::Fire => ChannelType::Public,
        };
        Ok(ChannelBinder::new(
            ChannelName::new(channel_type, route, id.map(String::from)),
            self.client.clone(),
            self.transport.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SendEnvelope;
    use crate::router::{Route, Router};
    use async_trait::async_trait;

    struct NullClient;

    #[async_trait]
    impl SocketClient for NullClient {
        async fn subscribe(&self, _channel_name: &str) -> AppResult<ChannelHandle> {
            let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
            Ok(ChannelHandle { events: rx })
        }

        async fn unsubscribe(&self, _channel_name: &str) -> AppResult<()> {
            Ok(())
        }

        fn socket_id(&self) -> Option<String> {
            None
        }
    }

    struct NullTransport;

    #[async_trait]
    impl SendTransport for NullTransport {
        async fn call(&self, _route: &str, _event: &str, _envelope: &SendEnvelope) -> AppResult<()> {
            Ok(())
        }
    }

    fn factory() -> ChannelFactory {
        use serde::{Deserialize, Serialize};
        use validator::Validate;

        #[derive(Serialize, Deserialize, Validate)]
        struct User {
            name: String,
        }

        let router = Router::<()>::builder()
            .route(
                "game",
                Route::presence::<User>().auth(|_ctx: (), data: User| async move { Ok(data) }),
            )
            .unwrap()
            .route("lobby", Route::fire())
            .unwrap()
            .build();
        ChannelFactory::new(router.contract(), Arc::new(NullClient), Arc::new(NullTransport))
    }

    #[test]
    fn presence_routes_get_presence_channels() {
        let factory = factory();
        let binder = factory.channel("game", Some("p1")).unwrap();
        assert_eq!(binder.channel_name(), "presence-game-p1");
        let binder = factory.channel("lobby", None).unwrap();
        assert_eq!(binder.channel_name(), "lobby");
    }

    #[test]
    fn unknown_route_is_rejected() {
        let err = factory().channel("missing", None).unwrap_err();
        assert!(matches!(err, AppError::RouteNotFound(_)));
    }
}
