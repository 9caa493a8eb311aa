//! Transport for outbound sends, addressed by `{route}.{event}`.

use crate::error::{AppError, AppResult};
use crate::models::SendEnvelope;
use async_trait::async_trait;

/// Carries a send envelope to the server-side procedure for the route.
/// The call resolving means "accepted", never that any resulting
/// broadcast has been delivered.
#[async_trait]
pub trait SendTransport: Send + Sync {
    async fn call(&self, route: &str, event: &str, envelope: &SendEnvelope) -> AppResult<()>;
}

/// HTTP transport: POST `{base_url}/{route}.{event}` with the envelope
/// as the JSON body.
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SendTransport for HttpTransport {
    async fn call(&self, route: &str, event: &str, envelope: &SendEnvelope) -> AppResult<()> {
        let url = format!("{}/{}.{}", self.base_url.trim_end_matches('/'), route, event);
        let response = self.http.post(&url).json(envelope).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "send `{}.{}` rejected with status {}",
                route,
                event,
                response.status()
            )));
        }
        Ok(())
    }
}
