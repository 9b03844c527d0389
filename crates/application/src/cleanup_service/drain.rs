use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use jit_cleaner_core::{AppError, AppResult};
use tracing::{info, warn};

use crate::cleanup_ports::{QueueMessage, QueueSubscriber};

use super::{FailureDisposition, MessageRouter, Republisher, RouteOutcome};

/// Counters for one drain cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Non-empty batches processed.
    pub batches: u32,
    /// Messages pulled across all batches.
    pub pulled: u32,
    /// Messages acknowledged.
    pub acknowledged: u32,
    /// Bindings removed.
    pub revoked: u32,
    /// Expired grants whose binding was already gone.
    pub already_revoked: u32,
    /// Stale messages republished as binding messages.
    pub requeued: u32,
    /// Messages republished under the error origin.
    pub quarantined: u32,
    /// Messages from other stages or without a recognized origin.
    pub ignored: u32,
    /// Messages left unacknowledged for redelivery.
    pub left_pending: u32,
}

impl DrainReport {
    fn record(&mut self, outcome: RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Ignored => &mut self.ignored,
            RouteOutcome::Quarantined => &mut self.quarantined,
            RouteOutcome::Revoked => &mut self.revoked,
            RouteOutcome::AlreadyRevoked => &mut self.already_revoked,
            RouteOutcome::Requeued => &mut self.requeued,
            RouteOutcome::Pending => &mut self.left_pending,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Drains a subscription: pull, route, batch-acknowledge until empty.
#[derive(Clone)]
pub struct DrainService {
    subscriber: Arc<dyn QueueSubscriber>,
    router: MessageRouter,
    republisher: Republisher,
}

impl DrainService {
    /// Creates a drain service.
    #[must_use]
    pub fn new(
        subscriber: Arc<dyn QueueSubscriber>,
        router: MessageRouter,
        republisher: Republisher,
    ) -> Self {
        Self {
            subscriber,
            router,
            republisher,
        }
    }

    /// Runs one drain cycle against `subscription`.
    ///
    /// Per-message failures never abort the cycle. Pull and acknowledge
    /// failures do, and leave the unacknowledged messages for redelivery.
    pub async fn run_drain_cycle(
        &self,
        subscription: &str,
        batch_size: usize,
    ) -> AppResult<DrainReport> {
        if batch_size == 0 {
            return Err(AppError::Validation(
                "batch size must be greater than zero".to_owned(),
            ));
        }

        let mut report = DrainReport::default();
        let mut seen_message_ids = HashSet::new();

        loop {
            let messages = self.subscriber.pull(subscription, batch_size).await?;
            if messages.is_empty() {
                break;
            }

            // Pending messages can come back within one cycle when the ack
            // deadline is short; stop once a batch holds nothing new.
            if messages
                .iter()
                .all(|message| seen_message_ids.contains(&message.message_id))
            {
                info!(
                    subscription = %subscription,
                    redelivered = messages.len(),
                    "only redelivered pending messages left; ending drain cycle"
                );
                break;
            }

            report.batches = report.batches.saturating_add(1);
            report.pulled = report
                .pulled
                .saturating_add(u32::try_from(messages.len()).unwrap_or(u32::MAX));

            let mut ack_ids = Vec::with_capacity(messages.len());
            for message in &messages {
                seen_message_ids.insert(message.message_id.clone());
                if self.process_message(message, &mut report).await {
                    ack_ids.push(message.ack_id.clone());
                }
            }

            if !ack_ids.is_empty() {
                self.subscriber.acknowledge(subscription, &ack_ids).await?;
                report.acknowledged = report
                    .acknowledged
                    .saturating_add(u32::try_from(ack_ids.len()).unwrap_or(u32::MAX));
            }

            info!(
                subscription = %subscription,
                pulled = messages.len(),
                acknowledged = ack_ids.len(),
                "processed batch"
            );
        }

        info!(
            subscription = %subscription,
            batches = report.batches,
            pulled = report.pulled,
            acknowledged = report.acknowledged,
            revoked = report.revoked,
            already_revoked = report.already_revoked,
            requeued = report.requeued,
            quarantined = report.quarantined,
            ignored = report.ignored,
            left_pending = report.left_pending,
            "drain cycle completed"
        );

        Ok(report)
    }

    async fn process_message(&self, message: &QueueMessage, report: &mut DrainReport) -> bool {
        match self.router.route(message, Utc::now()).await {
            Ok(outcome) => {
                report.record(outcome);
                outcome.should_ack()
            }
            Err(error) => self.recover(message, &error, report).await,
        }
    }

    async fn recover(
        &self,
        message: &QueueMessage,
        error: &AppError,
        report: &mut DrainReport,
    ) -> bool {
        let disposition = FailureDisposition::for_error(error);
        warn!(
            message_id = %message.message_id,
            error = %error,
            disposition = disposition.as_str(),
            "message processing failed"
        );

        match disposition {
            FailureDisposition::Quarantine => match self.republisher.quarantine(&message.data).await
            {
                Ok(_) => {
                    report.record(RouteOutcome::Quarantined);
                    true
                }
                Err(publish_error) => {
                    warn!(
                        message_id = %message.message_id,
                        error = %publish_error,
                        "failed to quarantine message; leaving it for redelivery"
                    );
                    report.record(RouteOutcome::Pending);
                    false
                }
            },
            FailureDisposition::LeavePending => {
                report.record(RouteOutcome::Pending);
                false
            }
        }
    }
}
