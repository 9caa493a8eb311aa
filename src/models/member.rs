//! Presence members.

use serde::{Deserialize, Serialize};

/// One subscribed participant on a presence channel, as reported by the
/// provider: the presence identity plus the application-defined info
/// attached at authorization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub info: serde_json::Value,
}

impl Member {
    pub fn new(id: impl Into<String>, info: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            info,
        }
    }
}
