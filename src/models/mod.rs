//! Wire-level data model: channel names, members, envelopes, webhooks.

pub mod channel;
pub mod envelope;
pub mod member;
pub mod webhook;

pub use channel::{ChannelName, ChannelParseError, ChannelType};
pub use envelope::{AuthRequest, SendEnvelope};
pub use member::Member;
pub use webhook::{WebhookBatch, WebhookEvent};
