//! Outbound reply delivery.
//!
//! Replies are pushed to the messaging channel's HTTP API with the
//! tenant's own access token. The wire shape stays channel-agnostic: text
//! blocks go out as text messages, menu blocks as button templates whose
//! buttons carry the engine's postback data verbatim.

use crate::config::ChannelConfig;
use bookline_core::ChannelUserId;
use bookline_dialogue::{MessageBlock, Reply};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// Delivery failures.
#[derive(Debug)]
pub enum ChannelError {
    /// Building the HTTP client failed.
    ClientBuild { reason: String },
    /// The request never completed.
    Transport { reason: String },
    /// The push API answered with a non-success status.
    Rejected { status: u16 },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBuild { reason } => write!(f, "channel client build failed: {reason}"),
            Self::Transport { reason } => write!(f, "channel push transport failed: {reason}"),
            Self::Rejected { status } => write!(f, "channel push rejected with status {status}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// HTTP client for the channel push API.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    http: reqwest::Client,
    api_base: String,
}

impl ChannelClient {
    /// Builds a client from the channel configuration.
    pub fn new(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ChannelError::ClientBuild {
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Pushes one reply to one user. Empty replies are not sent.
    pub async fn push_reply(
        &self,
        access_token: &str,
        user_id: &ChannelUserId,
        reply: &Reply,
    ) -> Result<(), ChannelError> {
        if reply.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/messages/push", self.api_base))
            .bearer_auth(access_token)
            .json(&push_body(user_id, reply))
            .send()
            .await
            .map_err(|e| ChannelError::Transport {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChannelError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

fn push_body(user_id: &ChannelUserId, reply: &Reply) -> Value {
    let messages: Vec<Value> = reply
        .messages
        .iter()
        .map(|block| match block {
            MessageBlock::Text { text } => json!({ "type": "text", "text": text }),
            MessageBlock::Menu { title, options } => json!({
                "type": "buttons",
                "title": title,
                "buttons": options
                    .iter()
                    .map(|o| json!({ "label": o.label, "data": o.data }))
                    .collect::<Vec<_>>(),
            }),
        })
        .collect();

    json!({ "to": user_id.as_str(), "messages": messages })
}
