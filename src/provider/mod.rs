//! Hosted pub/sub provider: the narrow seam the rest of the crate calls
//! through. Channel authorization is signed locally (HMAC over
//! `socket_id:channel_name[:channel_data]`); triggers go out over the
//! provider's HTTP event API.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Signed authorization response sent verbatim to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAuth {
    /// `{app_key}:{signature}`.
    pub auth: String,
    /// Serialized presence data, present for member-tracking channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

/// Presence identity attached to a channel authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceData {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<serde_json::Value>,
}

/// The pub/sub provider as seen by this crate.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Issue a signed authorization for `socket_id` to join `channel_name`,
    /// attaching the presence identity when the channel tracks members.
    async fn authorize_channel(
        &self,
        socket_id: &str,
        channel_name: &str,
        presence: Option<&PresenceData>,
    ) -> AppResult<ChannelAuth>;

    /// Fire-and-forget broadcast of an event onto a channel.
    async fn trigger(&self, channel: &str, event: &str, data: serde_json::Value) -> AppResult<()>;

    /// Verify the signature header of a webhook against the raw body.
    fn verify_webhook(&self, signature: &str, body: &[u8]) -> bool;
}

/// Hosted provider client. Stateless between calls; safe to share
/// process-wide.
pub struct HostedProvider {
    app_id: String,
    app_key: String,
    app_secret: String,
    host: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TriggerBody<'a> {
    name: &'a str,
    channel: &'a str,
    data: serde_json::Value,
}

static SHARED: OnceCell<Arc<HostedProvider>> = OnceCell::new();

impl HostedProvider {
    pub fn new(app_id: String, app_key: String, app_secret: String, host: String) -> Self {
        Self {
            app_id,
            app_key,
            app_secret,
            host,
            http: reqwest::Client::new(),
        }
    }

    /// Process-wide client: created on first use, reused for the process
    /// lifetime. Survives however many times the caller re-wires itself.
    pub fn shared(config: &Config) -> Arc<HostedProvider> {
        SHARED
            .get_or_init(|| {
                info!(host = %config.provider_host, "creating shared provider client");
                Arc::new(HostedProvider::new(
                    config.app_id.clone(),
                    config.app_key.clone(),
                    config.app_secret.clone(),
                    config.provider_host.clone(),
                ))
            })
            .clone()
    }

    fn sign(&self, payload: &[u8]) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init: {}", e)))?;
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl Provider for HostedProvider {
    async fn authorize_channel(
        &self,
        socket_id: &str,
        channel_name: &str,
        presence: Option<&PresenceData>,
    ) -> AppResult<ChannelAuth> {
        let channel_data = presence
            .map(serde_json::to_string)
            .transpose()
            .map_err(AppError::from)?;

        let sign_payload = match &channel_data {
            Some(data) => format!("{}:{}:{}", socket_id, channel_name, data),
            None => format!("{}:{}", socket_id, channel_name),
        };
        let signature = self.sign(sign_payload.as_bytes())?;
        debug!(channel = %channel_name, socket_id = %socket_id, "channel authorized");

        Ok(ChannelAuth {
            auth: format!("{}:{}", self.app_key, signature),
            channel_data,
        })
    }

    async fn trigger(&self, channel: &str, event: &str, data: serde_json::Value) -> AppResult<()> {
        let body = serde_json::to_string(&TriggerBody {
            name: event,
            channel,
            data,
        })?;
        let signature = self.sign(body.as_bytes())?;
        let url = format!("https://{}/apps/{}/events", self.host, self.app_id);

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-app-key", &self.app_key)
            .header("x-app-signature", signature)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "trigger rejected with status {}",
                response.status()
            )));
        }
        debug!(channel = %channel, event = %event, "triggered");
        Ok(())
    }

    fn verify_webhook(&self, signature: &str, body: &[u8]) -> bool {
        match self.sign(body) {
            Ok(expected) => expected == signature,
            Err(_) => false,
        }
    }
}
