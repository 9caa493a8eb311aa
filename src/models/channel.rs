//! Channel types and wire naming conventions.
//!
//! A logical route maps onto a wire channel name of the form
//! `{type-}{route}{-id}`: the type token is omitted for public channels
//! and the id segment is omitted when the route has no instance
//! (e.g. `presence-game-abc123`, `private-lobby`, `game`).

use serde::{Deserialize, Serialize};
use std::fmt;

const SEPARATOR: char = '-';

/// Channel type carried in the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Public channel: no auth required, implicit when no prefix is present.
    Public,
    /// Private channel: requires a signed subscription.
    Private,
    /// Presence channel: signed subscription + member tracking.
    Presence,
    /// End-to-end encrypted channel.
    Encrypted,
    /// Cache channel: provider replays the last event to late subscribers.
    Cache,
}

impl ChannelType {
    /// Wire token for this type.
    pub fn token(&self) -> &'static str {
        match self {
            ChannelType::Public => "public",
            ChannelType::Private => "private",
            ChannelType::Presence => "presence",
            ChannelType::Encrypted => "encrypted",
            ChannelType::Cache => "cache",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "public" => Some(ChannelType::Public),
            "private" => Some(ChannelType::Private),
            "presence" => Some(ChannelType::Presence),
            "encrypted" => Some(ChannelType::Encrypted),
            "cache" => Some(ChannelType::Cache),
            _ => None,
        }
    }

    /// Whether channels of this type carry an authorized membership.
    pub fn has_members(&self) -> bool {
        matches!(
            self,
            ChannelType::Private | ChannelType::Presence | ChannelType::Encrypted
        )
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Parsed form of a wire channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelName {
    channel_type: ChannelType,
    route: String,
    id: Option<String>,
}

/// Failure to parse an attacker-supplied channel name. Returned, never
/// panicked, since parsing sits on the authorization path.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelParseError {
    #[error("empty channel name")]
    Empty,
    #[error("empty segment in channel name `{0}`")]
    EmptySegment(String),
    #[error("channel type `{0}` has no route segment")]
    MissingRoute(String),
    #[error("malformed channel name `{0}`")]
    Malformed(String),
}

impl ChannelName {
    pub fn new(channel_type: ChannelType, route: impl Into<String>, id: Option<String>) -> Self {
        Self {
            channel_type,
            route: route.into(),
            id,
        }
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Wire form: joins the non-empty parts, omitting the `public` token.
    pub fn wire(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if self.channel_type != ChannelType::Public {
            parts.push(self.channel_type.token());
        }
        parts.push(&self.route);
        if let Some(id) = &self.id {
            parts.push(id);
        }
        parts.join(&SEPARATOR.to_string())
    }

    /// Exact inverse of [`ChannelName::wire`]. A name with no recognized
    /// type token is public; with two segments the second is the instance
    /// id. The id may itself contain the separator when a type token is
    /// present.
    pub fn parse(name: &str) -> Result<Self, ChannelParseError> {
        if name.is_empty() {
            return Err(ChannelParseError::Empty);
        }
        let segments: Vec<&str> = name.split(SEPARATOR).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ChannelParseError::EmptySegment(name.to_string()));
        }

        if let Some(channel_type) = ChannelType::from_token(segments[0]) {
            let route = segments
                .get(1)
                .ok_or_else(|| ChannelParseError::MissingRoute(name.to_string()))?;
            let id = if segments.len() > 2 {
                Some(segments[2..].join(&SEPARATOR.to_string()))
            } else {
                None
            };
            return Ok(Self::new(channel_type, *route, id));
        }

        match segments.len() {
            1 => Ok(Self::new(ChannelType::Public, segments[0], None)),
            2 => Ok(Self::new(
                ChannelType::Public,
                segments[0],
                Some(segments[1].to_string()),
            )),
            _ => Err(ChannelParseError::Malformed(name.to_string())),
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [ChannelType; 5] = [
        ChannelType::Public,
        ChannelType::Private,
        ChannelType::Presence,
        ChannelType::Encrypted,
        ChannelType::Cache,
    ];

    #[test]
    fn round_trip_all_types() {
        for channel_type in ALL_TYPES {
            for id in [None, Some("abc123".to_string())] {
                let name = ChannelName::new(channel_type, "game", id.clone());
                let parsed = ChannelName::parse(&name.wire()).unwrap();
                assert_eq!(parsed, name, "wire = {}", name.wire());
            }
        }
    }

    #[test]
    fn public_is_implicit() {
        assert_eq!(
            ChannelName::new(ChannelType::Public, "game", None).wire(),
            "game"
        );
        assert_eq!(
            ChannelName::new(ChannelType::Public, "game", Some("p1".into())).wire(),
            "game-p1"
        );
        let parsed = ChannelName::parse("game-p1").unwrap();
        assert_eq!(parsed.channel_type(), ChannelType::Public);
        assert_eq!(parsed.route(), "game");
        assert_eq!(parsed.id(), Some("p1"));
    }

    #[test]
    fn presence_with_id() {
        let parsed = ChannelName::parse("presence-game-abc123").unwrap();
        assert_eq!(parsed.channel_type(), ChannelType::Presence);
        assert_eq!(parsed.route(), "game");
        assert_eq!(parsed.id(), Some("abc123"));
    }

    #[test]
    fn id_may_contain_separator_after_type_token() {
        let name = ChannelName::new(ChannelType::Presence, "game", Some("a-b-c".to_string()));
        assert_eq!(ChannelName::parse(&name.wire()).unwrap(), name);
    }

    #[test]
    fn malformed_names_fail_without_panicking() {
        assert_eq!(ChannelName::parse(""), Err(ChannelParseError::Empty));
        assert!(matches!(
            ChannelName::parse("presence-"),
            Err(ChannelParseError::EmptySegment(_))
        ));
        assert_eq!(
            ChannelName::parse("presence"),
            Err(ChannelParseError::MissingRoute("presence".to_string()))
        );
        // Unknown leading token with id-shaped trailing segments.
        assert!(matches!(
            ChannelName::parse("mystery-game-abc123"),
            Err(ChannelParseError::Malformed(_))
        ));
    }

    #[test]
    fn member_tracking_types() {
        assert!(ChannelType::Private.has_members());
        assert!(ChannelType::Presence.has_members());
        assert!(ChannelType::Encrypted.has_members());
        assert!(!ChannelType::Public.has_members());
        assert!(!ChannelType::Cache.has_members());
    }
}
