//! Chat bridge webhook messenger
//!
//! Talks JSON to a small bridge service that owns the actual bot session.
//! Prompts carry either buttons or reactions depending on the configured
//! affordance; inbound clicks come back through `POST /api/interactions`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{AffordanceStyle, MessengerConfig};
use crate::domain::{Decision, MatchProposal, MessageRef, ParticipantId, ProposalId};
use crate::error::{MatchbookError, Result};
use crate::messenger::{control_label, prompt_text, Broadcaster, Confirmable, OutcomeNotice};

/// Webhook messenger client
#[derive(Clone)]
pub struct WebhookMessenger {
    client: Client,
    base_url: String,
    prompt_channel: String,
    style: AffordanceStyle,
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    channel: &'a str,
    text: String,
    style: &'static str,
    controls: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proposal_id: Option<ProposalId>,
}

#[derive(Serialize)]
struct MessageEdit {
    text: String,
    controls: Vec<&'static str>,
}

#[derive(Serialize)]
struct ControlBinding {
    style: &'static str,
    controls: Vec<&'static str>,
    proposal_id: ProposalId,
}

#[derive(Serialize)]
struct DirectMessage<'a> {
    user_id: ParticipantId,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostedMessage {
    channel_id: String,
    message_id: String,
}

impl WebhookMessenger {
    pub fn new(base_url: String, prompt_channel: String, style: AffordanceStyle) -> Arc<Self> {
        Arc::new(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            prompt_channel,
            style,
        })
    }

    /// Webhook messenger when a bridge URL is configured
    pub fn from_config(config: &MessengerConfig) -> Option<Arc<Self>> {
        config.webhook_url.clone().map(|url| {
            info!("Webhook messaging enabled ({} affordance)", config.affordance.as_str());
            Self::new(url, config.prompt_channel.clone(), config.affordance)
        })
    }

    fn controls(&self) -> Vec<&'static str> {
        vec![
            control_label(self.style, Decision::Confirm),
            control_label(self.style, Decision::Deny),
        ]
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        error!("Chat bridge request failed: {} - {}", status, body);
        Err(MatchbookError::ExternalIo(format!("HTTP {}: {}", status, body)))
    }

    async fn post_message(&self, message: &OutgoingMessage<'_>) -> Result<MessageRef> {
        let resp = self
            .client
            .post(self.url("messages"))
            .json(message)
            .send()
            .await?;
        let posted: PostedMessage = Self::check(resp).await?.json().await?;
        Ok(MessageRef {
            channel_id: posted.channel_id,
            message_id: posted.message_id,
        })
    }
}

#[async_trait]
impl Confirmable for WebhookMessenger {
    async fn present(&self, proposal: &MatchProposal) -> Result<MessageRef> {
        let message = OutgoingMessage {
            channel: &self.prompt_channel,
            text: prompt_text(proposal, self.style),
            style: self.style.as_str(),
            controls: self.controls(),
            proposal_id: Some(proposal.id),
        };
        let posted = self.post_message(&message).await?;
        debug!("Presented proposal {} as {}", proposal.id, posted);
        Ok(posted)
    }

    async fn reattach(&self, proposal: &MatchProposal) -> Result<bool> {
        let Some(message) = &proposal.message else {
            return Ok(false);
        };
        let resp = self
            .client
            .put(self.url(&format!(
                "messages/{}/{}/controls",
                message.channel_id, message.message_id
            )))
            .json(&ControlBinding {
                style: self.style.as_str(),
                controls: self.controls(),
                proposal_id: proposal.id,
            })
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("Prompt for {} no longer exists", proposal.id);
            return Ok(false);
        }
        Self::check(resp).await?;
        Ok(true)
    }

    async fn conclude(&self, proposal: &MatchProposal, notice: &OutcomeNotice) -> Result<()> {
        let Some(message) = &proposal.message else {
            return Ok(());
        };
        let resp = self
            .client
            .patch(self.url(&format!(
                "messages/{}/{}",
                message.channel_id, message.message_id
            )))
            .json(&MessageEdit {
                text: notice.text(),
                controls: Vec::new(),
            })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn reject(
        &self,
        actor: ParticipantId,
        _proposal_id: ProposalId,
        reason: &str,
    ) -> Result<()> {
        let resp = self
            .client
            .post(self.url("direct"))
            .json(&DirectMessage {
                user_id: actor,
                text: reason,
            })
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl Broadcaster for WebhookMessenger {
    async fn broadcast(&self, channel: &str, notice: &OutcomeNotice) -> Result<()> {
        let message = OutgoingMessage {
            channel,
            text: notice.text(),
            style: self.style.as_str(),
            controls: Vec::new(),
            proposal_id: None,
        };
        self.post_message(&message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_url() {
        assert!(WebhookMessenger::from_config(&MessengerConfig::default()).is_none());

        let config = MessengerConfig {
            webhook_url: Some("http://bridge.local/".into()),
            affordance: AffordanceStyle::Reactions,
            ..MessengerConfig::default()
        };
        let messenger = WebhookMessenger::from_config(&config).unwrap();
        assert_eq!(messenger.url("messages"), "http://bridge.local/messages");
        assert_eq!(messenger.controls(), vec!["✅", "❌"]);
    }

    #[test]
    fn test_outgoing_message_shape() {
        let message = OutgoingMessage {
            channel: "general",
            text: "hello".into(),
            style: "buttons",
            controls: vec!["confirm", "deny"],
            proposal_id: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["channel"], "general");
        assert_eq!(json["controls"][1], "deny");
        assert!(json.get("proposal_id").is_none());
    }
}
