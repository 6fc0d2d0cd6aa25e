//! Outcome broadcast to subscribed channels
//!
//! Each channel is attempted independently: a failed send is logged and
//! counted, never retried and never propagated back into the ledger path.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::FanoutConfig;
use crate::messenger::{Broadcaster, OutcomeNotice};

/// Delivery tally for one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    pub delivered: usize,
    pub skipped: usize,
    /// (channel, reason)
    pub failed: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct NotificationFanout {
    broadcaster: Arc<dyn Broadcaster>,
    channels: Vec<String>,
    delay: Duration,
    /// Configured name of the channel prompts are posted in
    prompt_channel: Option<String>,
}

impl NotificationFanout {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, channels: Vec<String>, delay: Duration) -> Self {
        Self {
            broadcaster,
            channels,
            delay,
            prompt_channel: None,
        }
    }

    pub fn with_prompt_channel(mut self, name: impl Into<String>) -> Self {
        self.prompt_channel = Some(name.into());
        self
    }

    pub fn from_config(broadcaster: Arc<dyn Broadcaster>, config: &FanoutConfig) -> Self {
        Self::new(
            broadcaster,
            config.channels.clone(),
            Duration::from_millis(config.delay_ms),
        )
    }

    /// Send `notice` to every channel. The prompt channel is skipped when
    /// `prompt_shown`, since the concluded prompt already carries the outcome.
    pub async fn announce(&self, notice: &OutcomeNotice, prompt_shown: bool) -> FanoutReport {
        let mut report = FanoutReport::default();
        let mut first = true;

        for channel in &self.channels {
            if prompt_shown && self.prompt_channel.as_deref() == Some(channel.as_str()) {
                report.skipped += 1;
                continue;
            }
            if !first && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            first = false;

            match self.broadcaster.broadcast(channel, notice).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Broadcast of {} to {} failed: {}", notice.proposal_id, channel, e);
                    report.failed.push((channel.clone(), e.to_string()));
                }
            }
        }

        info!(
            proposal = %notice.proposal_id,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Outcome broadcast to {}/{} channels",
            report.delivered,
            self.channels.len() - report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchKind, ProposalId, ProposalStatus};
    use crate::error::MatchbookError;
    use crate::messenger::MockBroadcaster;
    use tokio::time::Instant;

    fn notice() -> OutcomeNotice {
        OutcomeNotice {
            proposal_id: ProposalId::new(),
            kind: MatchKind::Duel,
            status: ProposalStatus::Applied,
            title: "1v1 result confirmed".into(),
            body: "<@1> 20 - 10 <@2>".into(),
        }
    }

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_block_others() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_broadcast()
            .withf(|channel, _| channel == "c2")
            .times(1)
            .returning(|_, _| Err(MatchbookError::ExternalIo("HTTP 500".into())));
        broadcaster
            .expect_broadcast()
            .withf(|channel, _| channel != "c2")
            .times(2)
            .returning(|_, _| Ok(()));

        let fanout = NotificationFanout::new(
            Arc::new(broadcaster),
            channels(&["c1", "c2", "c3"]),
            Duration::ZERO,
        );
        let report = fanout.announce(&notice(), false).await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "c2");
    }

    #[tokio::test]
    async fn test_prompt_channel_is_skipped_once_shown() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster
            .expect_broadcast()
            .withf(|channel, _| channel != "results")
            .times(2)
            .returning(|_, _| Ok(()));

        let fanout = NotificationFanout::new(
            Arc::new(broadcaster),
            channels(&["a", "results", "b"]),
            Duration::ZERO,
        )
        .with_prompt_channel("results");
        let report = fanout.announce(&notice(), true).await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_prompt_channel_gets_notice_when_prompt_was_never_posted() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster.expect_broadcast().times(3).returning(|_, _| Ok(()));

        let fanout = NotificationFanout::new(
            Arc::new(broadcaster),
            channels(&["a", "results", "b"]),
            Duration::ZERO,
        )
        .with_prompt_channel("results");
        let report = fanout.announce(&notice(), false).await;
        assert_eq!(report.delivered, 3);
        assert_eq!(report.skipped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_are_paced() {
        let mut broadcaster = MockBroadcaster::new();
        broadcaster.expect_broadcast().times(3).returning(|_, _| Ok(()));

        let fanout = NotificationFanout::new(
            Arc::new(broadcaster),
            channels(&["a", "b", "c"]),
            Duration::from_millis(500),
        );
        let started = Instant::now();
        fanout.announce(&notice(), false).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1500));
    }
}
