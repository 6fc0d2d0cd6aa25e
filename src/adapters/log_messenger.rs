//! Messenger that only writes to the log, for dry runs without a chat bridge

use async_trait::async_trait;
use tracing::info;

use crate::config::AffordanceStyle;
use crate::domain::{MatchProposal, MessageRef, ParticipantId, ProposalId};
use crate::error::Result;
use crate::messenger::{prompt_text, Broadcaster, Confirmable, OutcomeNotice};

pub struct LogMessenger {
    prompt_channel: String,
    style: AffordanceStyle,
}

impl LogMessenger {
    pub fn new(prompt_channel: String, style: AffordanceStyle) -> Self {
        Self {
            prompt_channel,
            style,
        }
    }
}

#[async_trait]
impl Confirmable for LogMessenger {
    async fn present(&self, proposal: &MatchProposal) -> Result<MessageRef> {
        info!(
            proposal = %proposal.id,
            "[{}] {}",
            self.prompt_channel,
            prompt_text(proposal, self.style)
        );
        Ok(MessageRef {
            channel_id: self.prompt_channel.clone(),
            message_id: proposal.id.to_string(),
        })
    }

    async fn reattach(&self, proposal: &MatchProposal) -> Result<bool> {
        Ok(proposal.message.is_some())
    }

    async fn conclude(&self, proposal: &MatchProposal, notice: &OutcomeNotice) -> Result<()> {
        info!(proposal = %proposal.id, "[{}] {}", self.prompt_channel, notice.text());
        Ok(())
    }

    async fn reject(&self, actor: ParticipantId, proposal_id: ProposalId, reason: &str) -> Result<()> {
        info!(proposal = %proposal_id, "[dm {}] {}", actor, reason);
        Ok(())
    }
}

#[async_trait]
impl Broadcaster for LogMessenger {
    async fn broadcast(&self, channel: &str, notice: &OutcomeNotice) -> Result<()> {
        info!(proposal = %notice.proposal_id, "[{}] {}", channel, notice.text());
        Ok(())
    }
}
