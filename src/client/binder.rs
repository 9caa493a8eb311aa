//! Client channel binder: owns one subscription lifecycle and mediates
//! all sends and receives for one logical channel instance.

use crate::client::socket::{ChannelEvent, SocketClient};
use crate::client::transport::SendTransport;
use crate::error::{AppError, AppResult};
use crate::models::{ChannelName, ChannelType, Member, SendEnvelope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Subscription lifecycle. `Error` is terminal until the caller
/// explicitly re-subscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Unsubscribed,
    Subscribing,
    Subscribed,
    Error,
}

/// Token returned by [`ChannelBinder::bind`], consumed by `unbind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding(u64);

type Listener = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

struct BinderState {
    status: SubscriptionStatus,
    members: HashMap<String, Member>,
    me: Option<Member>,
    error: Option<String>,
    /// Set once the provider channel handle has been created; bind and
    /// unbind are only legal after that point.
    channel_open: bool,
}

struct BinderInner {
    name: ChannelName,
    wire: String,
    client: Arc<dyn SocketClient>,
    transport: Arc<dyn SendTransport>,
    state: Mutex<BinderState>,
    listeners: Mutex<HashMap<String, Vec<(u64, Listener)>>>,
    next_binding: AtomicU64,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// One binder per (channel name, subscriber). Not safe for concurrent
/// `subscribe` calls racing each other; callers gate subscribe and
/// unsubscribe behind their own lifecycle.
#[derive(Clone)]
pub struct ChannelBinder {
    inner: Arc<BinderInner>,
}

impl std::fmt::Debug for ChannelBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinder")
            .field("wire", &self.inner.wire)
            .finish_non_exhaustive()
    }
}

impl ChannelBinder {
    pub fn new(
        name: ChannelName,
        client: Arc<dyn SocketClient>,
        transport: Arc<dyn SendTransport>,
    ) -> Self {
        let wire = name.wire();
        Self {
            inner: Arc::new(BinderInner {
                name,
                wire,
                client,
                transport,
                state: Mutex::new(BinderState {
                    status: SubscriptionStatus::Unsubscribed,
                    members: HashMap::new(),
                    me: None,
                    error: None,
                    channel_open: false,
                }),
                listeners: Mutex::new(HashMap::new()),
                next_binding: AtomicU64::new(1),
                pump: Mutex::new(None),
            }),
        }
    }

    pub fn channel_name(&self) -> &str {
        &self.inner.wire
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.inner.state.lock().unwrap().status
    }

    pub fn is_subscribed(&self) -> bool {
        self.status() == SubscriptionStatus::Subscribed
    }

    /// Error flag, surfaced instead of a thrown exception because
    /// subscription is not tied to a single call frame.
    pub fn has_error(&self) -> bool {
        self.inner.state.lock().unwrap().error.is_some()
    }

    pub fn members(&self) -> Vec<Member> {
        self.inner
            .state
            .lock()
            .unwrap()
            .members
            .values()
            .cloned()
            .collect()
    }

    pub fn me(&self) -> Option<Member> {
        self.inner.state.lock().unwrap().me.clone()
    }

    /// Subscribe to the channel and start pumping its event stream.
    pub async fn subscribe(&self) -> AppResult<()> {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.status = SubscriptionStatus::Subscribing;
            state.error = None;
        }

        let handle = match self.inner.client.subscribe(&self.inner.wire).await {
            Ok(handle) => handle,
            Err(e) => {
                let mut state = self.inner.state.lock().unwrap();
                state.status = SubscriptionStatus::Error;
                state.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.inner.state.lock().unwrap().channel_open = true;

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let mut events = handle.events;
            while let Some(event) = events.recv().await {
                inner.apply(event);
            }
        });
        if let Some(previous) = self.inner.pump.lock().unwrap().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Attach a listener for a named application or lifecycle event.
    /// Fails before the first `subscribe()`: the provider channel handle
    /// does not exist yet.
    pub fn bind(
        &self,
        event: &str,
        listener: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> AppResult<Binding> {
        self.require_channel()?;
        let id = self.inner.next_binding.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        Ok(Binding(id))
    }

    pub fn unbind(&self, event: &str, binding: Binding) -> AppResult<()> {
        self.require_channel()?;
        let mut listeners = self.inner.listeners.lock().unwrap();
        if let Some(bound) = listeners.get_mut(event) {
            bound.retain(|(id, _)| *id != binding.0);
            if bound.is_empty() {
                listeners.remove(event);
            }
        }
        Ok(())
    }

    /// Wrap the payload in a send envelope and fire it at the route's
    /// procedure. For presence channels the current membership snapshot
    /// rides along; a send before the socket id is known still goes out
    /// with the field omitted.
    pub async fn send(&self, event: &str, payload: serde_json::Value) -> AppResult<()> {
        let (members, me) = {
            let state = self.inner.state.lock().unwrap();
            if self.inner.name.channel_type() == ChannelType::Presence {
                (
                    Some(state.members.values().cloned().collect::<Vec<_>>()),
                    state.me.clone(),
                )
            } else {
                (None, None)
            }
        };

        let envelope = SendEnvelope {
            channel_type: self.inner.name.channel_type(),
            channel_id: self.inner.name.id().map(|s| s.to_string()),
            channel_name: self.inner.wire.clone(),
            event: event.to_string(),
            socket_id: self.inner.client.socket_id(),
            members,
            me,
            data: payload,
        };

        self.inner
            .transport
            .call(self.inner.name.route(), event, &envelope)
            .await
    }

    /// Release the channel handle and clear local membership state.
    /// Idempotent: safe on a binder that never subscribed.
    pub async fn unsubscribe(&self) {
        let was_open = {
            let mut state = self.inner.state.lock().unwrap();
            let was_open = state.channel_open;
            state.channel_open = false;
            state.status = SubscriptionStatus::Unsubscribed;
            state.members.clear();
            state.me = None;
            state.error = None;
            was_open
        };

        if let Some(task) = self.inner.pump.lock().unwrap().take() {
            task.abort();
        }

        if was_open {
            if let Err(e) = self.inner.client.unsubscribe(&self.inner.wire).await {
                warn!(channel = %self.inner.wire, error = %e, "unsubscribe failed");
            }
        }
    }

    fn require_channel(&self) -> AppResult<()> {
        if self.inner.state.lock().unwrap().channel_open {
            Ok(())
        } else {
            Err(AppError::Binder(format!(
                "channel `{}` not subscribed yet",
                self.inner.wire
            )))
        }
    }
}

impl BinderInner {
    /// Apply one delivered event. Member patches are dropped until the
    /// initial snapshot has been applied, so an early patch can never
    /// race the snapshot that replaces the whole map.
    fn apply(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::SubscriptionSucceeded { members, me } => {
                let data = {
                    let mut state = self.state.lock().unwrap();
                    state.members = members.into_iter().map(|m| (m.id.clone(), m)).collect();
                    state.me = me;
                    state.status = SubscriptionStatus::Subscribed;
                    state.error = None;
                    serde_json::to_value(state.members.values().collect::<Vec<_>>())
                        .unwrap_or(serde_json::Value::Null)
                };
                debug!(channel = %self.wire, "subscribed");
                self.notify("subscription_succeeded", &data);
            }
            ChannelEvent::SubscriptionError { message } => {
                {
                    let mut state = self.state.lock().unwrap();
                    state.status = SubscriptionStatus::Error;
                    state.error = Some(message.clone());
                }
                warn!(channel = %self.wire, message = %message, "subscription error");
                self.notify("subscription_error", &serde_json::Value::String(message));
            }
            ChannelEvent::MemberAdded { member } => {
                let ready = {
                    let mut state = self.state.lock().unwrap();
                    let ready = state.status == SubscriptionStatus::Subscribed;
                    if ready {
                        state.members.insert(member.id.clone(), member.clone());
                    }
                    ready
                };
                if ready {
                    let data = serde_json::to_value(&member).unwrap_or(serde_json::Value::Null);
                    self.notify("member_added", &data);
                }
            }
            ChannelEvent::MemberRemoved { id } => {
                let removed = {
                    let mut state = self.state.lock().unwrap();
                    if state.status == SubscriptionStatus::Subscribed {
                        state.members.remove(&id)
                    } else {
                        None
                    }
                };
                if let Some(member) = removed {
                    let data = serde_json::to_value(&member).unwrap_or(serde_json::Value::Null);
                    self.notify("member_removed", &data);
                }
            }
            ChannelEvent::Message { event, data } => {
                self.notify(&event, &data);
            }
        }
    }

    fn notify(&self, event: &str, data: &serde_json::Value) {
        let bound: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap();
            listeners
                .get(event)
                .map(|v| v.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };
        for listener in bound {
            listener(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::socket::ChannelHandle;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    struct MockClient {
        socket_id: Mutex<Option<String>>,
        unsubscribes: AtomicUsize,
    }

    impl MockClient {
        fn new(socket_id: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                socket_id: Mutex::new(socket_id.map(String::from)),
                unsubscribes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SocketClient for MockClient {
        async fn subscribe(&self, _channel_name: &str) -> AppResult<ChannelHandle> {
            let (_tx, rx) = mpsc::unbounded_channel();
            Ok(ChannelHandle { events: rx })
        }

        async fn unsubscribe(&self, _channel_name: &str) -> AppResult<()> {
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn socket_id(&self) -> Option<String> {
            self.socket_id.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct MockTransport {
        calls: Mutex<Vec<(String, String, SendEnvelope)>>,
    }

    #[async_trait]
    impl SendTransport for MockTransport {
        async fn call(&self, route: &str, event: &str, envelope: &SendEnvelope) -> AppResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((route.to_string(), event.to_string(), envelope.clone()));
            Ok(())
        }
    }

    fn member(id: &str, is_host: bool) -> Member {
        Member::new(id, serde_json::json!({ "name": id, "is_host": is_host }))
    }

    fn presence_binder(
        client: Arc<MockClient>,
        transport: Arc<MockTransport>,
    ) -> ChannelBinder {
        ChannelBinder::new(
            ChannelName::new(ChannelType::Presence, "game", Some("p1".to_string())),
            client,
            transport,
        )
    }

    #[tokio::test]
    async fn snapshot_replaces_and_patches_apply_after_ready() {
        let binder = presence_binder(MockClient::new(None), Arc::default());
        binder.subscribe().await.unwrap();

        // Patch delivered before the snapshot resolves: dropped.
        binder.inner.apply(ChannelEvent::MemberAdded {
            member: member("early", false),
        });
        assert!(binder.members().is_empty());

        binder.inner.apply(ChannelEvent::SubscriptionSucceeded {
            members: vec![member("a", true)],
            me: Some(member("a", true)),
        });
        assert!(binder.is_subscribed());
        assert_eq!(binder.members().len(), 1);
        assert!(binder.me().unwrap().info["is_host"].as_bool().unwrap());

        // add + remove of the same id nets to the snapshot count.
        binder.inner.apply(ChannelEvent::MemberAdded {
            member: member("b", false),
        });
        assert_eq!(binder.members().len(), 2);
        binder
            .inner
            .apply(ChannelEvent::MemberRemoved { id: "b".to_string() });
        assert_eq!(binder.members().len(), 1);
    }

    #[tokio::test]
    async fn subscription_error_sets_flag_without_retry() {
        let binder = presence_binder(MockClient::new(None), Arc::default());
        binder.subscribe().await.unwrap();
        binder.inner.apply(ChannelEvent::SubscriptionError {
            message: "forbidden".to_string(),
        });
        assert!(!binder.is_subscribed());
        assert!(binder.has_error());
        assert_eq!(binder.status(), SubscriptionStatus::Error);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let client = MockClient::new(None);
        let binder = presence_binder(client.clone(), Arc::default());

        // Never subscribed: both calls are no-ops.
        binder.unsubscribe().await;
        binder.unsubscribe().await;
        assert!(binder.members().is_empty());
        assert!(binder.me().is_none());
        assert_eq!(client.unsubscribes.load(Ordering::SeqCst), 0);

        binder.subscribe().await.unwrap();
        binder.unsubscribe().await;
        binder.unsubscribe().await;
        assert_eq!(client.unsubscribes.load(Ordering::SeqCst), 1);
        assert_eq!(binder.status(), SubscriptionStatus::Unsubscribed);
    }

    #[tokio::test]
    async fn bind_before_subscribe_fails() {
        let binder = presence_binder(MockClient::new(None), Arc::default());
        let result = binder.bind("round", |_| {});
        assert!(matches!(result, Err(AppError::Binder(_))));
    }

    #[tokio::test]
    async fn bound_listeners_fire_and_unbind_removes() {
        let binder = presence_binder(MockClient::new(None), Arc::default());
        binder.subscribe().await.unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = hits.clone();
        let binding = binder
            .bind("round", move |_| {
                hits_in.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        binder.inner.apply(ChannelEvent::Message {
            event: "round".to_string(),
            data: serde_json::json!({ "n": 1 }),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        binder.unbind("round", binding).unwrap();
        binder.inner.apply(ChannelEvent::Message {
            event: "round".to_string(),
            data: serde_json::json!({ "n": 2 }),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_before_connect_omits_socket_id() {
        let transport = Arc::new(MockTransport::default());
        let binder = presence_binder(MockClient::new(None), transport.clone());
        binder.subscribe().await.unwrap();

        binder
            .send("guess", serde_json::json!({ "title": "song" }))
            .await
            .unwrap();

        let calls = transport.calls.lock().unwrap();
        let (route, event, envelope) = &calls[0];
        assert_eq!(route, "game");
        assert_eq!(event, "guess");
        assert!(envelope.socket_id.is_none());
        assert_eq!(envelope.channel_name, "presence-game-p1");
    }

    #[tokio::test]
    async fn presence_send_snapshots_members_and_me() {
        let transport = Arc::new(MockTransport::default());
        let binder = presence_binder(MockClient::new(Some("7.7")), transport.clone());
        binder.subscribe().await.unwrap();
        binder.inner.apply(ChannelEvent::SubscriptionSucceeded {
            members: vec![member("a", true), member("b", false)],
            me: Some(member("a", true)),
        });

        binder.send("round", serde_json::json!({})).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        let envelope = &calls[0].2;
        assert_eq!(envelope.socket_id.as_deref(), Some("7.7"));
        assert_eq!(envelope.members.as_ref().unwrap().len(), 2);
        assert_eq!(envelope.me.as_ref().unwrap().id, "a");
        assert_eq!(envelope.channel_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn fire_send_has_no_snapshot() {
        let transport = Arc::new(MockTransport::default());
        let binder = ChannelBinder::new(
            ChannelName::new(ChannelType::Public, "lobby", None),
            MockClient::new(Some("7.7")),
            transport.clone(),
        );
        binder.subscribe().await.unwrap();
        binder.send("ping", serde_json::json!({})).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        let envelope = &calls[0].2;
        assert!(envelope.members.is_none());
        assert!(envelope.me.is_none());
        assert_eq!(envelope.channel_name, "lobby");
    }
}
