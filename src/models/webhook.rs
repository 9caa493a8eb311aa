//! Provider webhook payloads.

use serde::{Deserialize, Serialize};

/// Signed batch of out-of-band provider events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBatch {
    #[serde(default)]
    pub time_ms: Option<i64>,
    pub events: Vec<WebhookEvent>,
}

/// One provider event, e.g. `member_removed` on `presence-game-abc123`
/// or `channel_vacated` when the last subscriber leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub name: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
}
