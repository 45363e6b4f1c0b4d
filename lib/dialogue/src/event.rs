//! Inbound channel events.
//!
//! The webhook translates whatever the messaging channel delivers into a
//! [`ChannelEvent`]; the engine never sees channel-specific payloads.

use bookline_core::{ChannelUserId, TenantId};
use serde::{Deserialize, Serialize};

/// What kind of event the channel delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
    /// The user typed free text.
    Text { text: String },
    /// The user tapped a menu option; `data` is the machine-readable id
    /// the option carried.
    Postback { data: String },
    /// The user added the bot.
    Follow,
    /// The user removed or blocked the bot.
    Unfollow,
}

/// One inbound event from the chat channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// The tenant whose channel received the event.
    pub tenant_id: TenantId,
    /// The channel-assigned end user.
    pub user_id: ChannelUserId,
    /// What happened.
    pub kind: EventKind,
}

impl ChannelEvent {
    /// Creates a text event.
    #[must_use]
    pub fn text(tenant_id: TenantId, user_id: ChannelUserId, text: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            kind: EventKind::Text { text: text.into() },
        }
    }

    /// Creates a postback event.
    #[must_use]
    pub fn postback(tenant_id: TenantId, user_id: ChannelUserId, data: impl Into<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            kind: EventKind::Postback { data: data.into() },
        }
    }

    /// Creates a follow event.
    #[must_use]
    pub fn follow(tenant_id: TenantId, user_id: ChannelUserId) -> Self {
        Self {
            tenant_id,
            user_id,
            kind: EventKind::Follow,
        }
    }

    /// Creates an unfollow event.
    #[must_use]
    pub fn unfollow(tenant_id: TenantId, user_id: ChannelUserId) -> Self {
        Self {
            tenant_id,
            user_id,
            kind: EventKind::Unfollow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serde_roundtrip() {
        let event = ChannelEvent::postback(TenantId::new(), ChannelUserId::new("Uabc"), "book");
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("postback"));
        let parsed: ChannelEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, parsed);
    }
}
