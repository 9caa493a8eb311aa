//! Client-side seam to the pub/sub connection.

use crate::error::AppResult;
use crate::models::Member;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Lifecycle and application events delivered on one channel, in the
/// provider's own delivery order.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// Initial snapshot: full member list plus the local client's own
    /// identity as assigned by the authorization response.
    SubscriptionSucceeded {
        members: Vec<Member>,
        me: Option<Member>,
    },
    SubscriptionError {
        message: String,
    },
    MemberAdded {
        member: Member,
    },
    MemberRemoved {
        id: String,
    },
    /// A named application event broadcast on the channel.
    Message {
        event: String,
        data: serde_json::Value,
    },
}

/// Handle to one subscribed channel: the event stream the binder pumps.
pub struct ChannelHandle {
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// The underlying pub/sub connection. Implementations cache the socket
/// id from the connection-established event once, globally.
#[async_trait]
pub trait SocketClient: Send + Sync {
    async fn subscribe(&self, channel_name: &str) -> AppResult<ChannelHandle>;

    async fn unsubscribe(&self, channel_name: &str) -> AppResult<()>;

    /// `None` until the connection-established event has been observed.
    fn socket_id(&self) -> Option<String>;
}
