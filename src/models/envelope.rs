//! Wire payloads for the authorization endpoint and outbound sends.

use crate::models::channel::ChannelType;
use crate::models::member::Member;
use serde::{Deserialize, Serialize};

/// Body of an authorization request: the provider-assigned socket id,
/// the wire channel name, and whatever user payload the client attached
/// (matched against the route's user schema).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub socket_id: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Outbound message envelope: the caller's payload wrapped with protocol
/// metadata. For presence routes the current membership snapshot rides
/// along so the receiving procedure can act on it without a lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEnvelope {
    pub channel_type: ChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub channel_name: String,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub me: Option<Member>,
    pub data: serde_json::Value,
}
