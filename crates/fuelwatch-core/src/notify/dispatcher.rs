//! Notification dispatch
//!
//! Fans a message out to every configured recipient:
//! - Each recipient runs as its own task, bounded by a concurrency limit
//! - Each attempt has its own timeout, followed by exponential backoff retries
//! - One recipient failing or timing out never affects the others
//!
//! Delivery is best-effort: no outbox is kept, so a crash mid-dispatch can
//! lose a notification.

use super::{format_alert, format_report, Notifier, NotifyError, ReportKind};
use crate::aggregator::FleetStats;
use crate::config::{DispatchConfig, EngineConfig};
use crate::observability::EngineMetrics;
use crate::tracker::TransitionEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Delivery outcome for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub recipient: String,
    pub delivered: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientOutcome {
    fn delivered(recipient: &str, attempts: u32) -> Self {
        Self {
            recipient: recipient.to_string(),
            delivered: true,
            attempts,
            error: None,
        }
    }

    fn failed(recipient: &str, attempts: u32, error: String) -> Self {
        Self {
            recipient: recipient.to_string(),
            delivered: false,
            attempts,
            error: Some(error),
        }
    }
}

/// Aggregated outcome of one dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Generator that triggered the alert; `None` for fleet reports
    pub generator_id: Option<String>,
    pub message: String,
    pub deliveries: Vec<RecipientOutcome>,
}

impl DispatchResult {
    /// Every recipient received the message
    pub fn is_complete(&self) -> bool {
        self.deliveries.iter().all(|d| d.delivered)
    }

    /// Some, but not all, recipients received the message
    pub fn is_partial(&self) -> bool {
        let delivered = self.delivered_count();
        delivered > 0 && delivered < self.deliveries.len()
    }

    pub fn delivered_count(&self) -> usize {
        self.deliveries.iter().filter(|d| d.delivered).count()
    }

    pub fn failed_recipients(&self) -> Vec<&str> {
        self.deliveries
            .iter()
            .filter(|d| !d.delivered)
            .map(|d| d.recipient.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
}

/// Sends alerts and reports through an injected [`Notifier`]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
    config: DispatchConfig,
    metrics: Option<EngineMetrics>,
}

impl Dispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        recipients: Vec<String>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            notifier,
            recipients,
            config,
            metrics: None,
        }
    }

    pub fn from_config(notifier: Arc<dyn Notifier>, config: &EngineConfig) -> Self {
        Self::new(notifier, config.recipients.clone(), config.dispatch.clone())
    }

    /// Record delivery outcomes in the Prometheus registry
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Notify every recipient about a Normal -> Suspicious transition
    pub async fn dispatch(&self, event: &TransitionEvent) -> DispatchResult {
        let message = format_alert(&event.classified);
        self.send_all(Some(event.generator_id().to_string()), message)
            .await
    }

    /// Send a fleet summary to every recipient
    pub async fn broadcast_report(&self, kind: ReportKind, stats: &FleetStats) -> DispatchResult {
        self.send_all(None, format_report(kind, stats)).await
    }

    async fn send_all(&self, generator_id: Option<String>, message: String) -> DispatchResult {
        let start = Instant::now();
        let deliveries = self.fan_out(&message).await;

        let result = DispatchResult {
            generator_id,
            message,
            deliveries,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_dispatch(&result, start.elapsed().as_secs_f64());
        }

        result
    }

    async fn fan_out(&self, message: &str) -> Vec<RecipientOutcome> {
        let policy = RetryPolicy {
            timeout: self.config.timeout(),
            max_retries: self.config.max_retries,
            initial_backoff: self.config.initial_backoff(),
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let message: Arc<str> = Arc::from(message);

        let mut tasks = JoinSet::new();
        for (index, recipient) in self.recipients.iter().enumerate() {
            let notifier = Arc::clone(&self.notifier);
            let semaphore = Arc::clone(&semaphore);
            let message = Arc::clone(&message);
            let recipient = recipient.clone();

            tasks.spawn(async move {
                // the semaphore is never closed, so acquiring cannot fail
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = deliver(notifier.as_ref(), &recipient, &message, policy).await;
                (index, outcome)
            });
        }

        // a recipient whose task panics keeps this placeholder
        let mut outcomes: Vec<RecipientOutcome> = self
            .recipients
            .iter()
            .map(|r| RecipientOutcome::failed(r, 0, "delivery task aborted".to_string()))
            .collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => warn!(error = %e, "Notification task did not complete"),
            }
        }

        outcomes
    }
}

async fn deliver(
    notifier: &dyn Notifier,
    recipient: &str,
    message: &str,
    policy: RetryPolicy,
) -> RecipientOutcome {
    let mut attempts = 0u32;
    let mut backoff = policy.initial_backoff;

    loop {
        attempts += 1;

        let send = notifier.send(recipient, message);
        let result = match tokio::time::timeout(policy.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(policy.timeout)),
        };

        match result {
            Ok(()) => {
                debug!(recipient = %recipient, attempts = attempts, "Notification delivered");
                return RecipientOutcome::delivered(recipient, attempts);
            }
            Err(e) if attempts > policy.max_retries => {
                warn!(
                    recipient = %recipient,
                    attempts = attempts,
                    error = %e,
                    "Notification failed, retry budget exhausted"
                );
                return RecipientOutcome::failed(recipient, attempts, e.to_string());
            }
            Err(e) => {
                debug!(
                    recipient = %recipient,
                    attempt = attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Notification attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = backoff.checked_mul(2).unwrap_or(backoff);
            }
        }
    }
}
