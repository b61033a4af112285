//! Operator notification
//!
//! This module provides:
//! - The [`Notifier`] capability the host supplies for message delivery
//! - Alert and summary report formatting
//! - A dispatcher fanning messages out to recipients with retry and
//!   per-recipient failure isolation

mod dispatcher;
mod message;

pub use dispatcher::{DispatchResult, Dispatcher, RecipientOutcome};
pub use message::{format_alert, format_report, ReportKind};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("recipient {recipient} rejected: {reason}")]
    Rejected { recipient: String, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Message delivery capability supplied by the host (chat API, SMS, ...)
///
/// The engine never opens network connections itself.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that writes every message to the structured log
///
/// Useful as a default when no delivery channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        info!(
            event = "notification",
            recipient = %recipient,
            message = %message,
            "Notification delivered to log"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_always_delivers() {
        let notifier = LogNotifier;
        let result = tokio_test::block_on(notifier.send("+15550001", "Suspicious fuel activity"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_notify_error_messages() {
        let rejected = NotifyError::Rejected {
            recipient: "+15550001".to_string(),
            reason: "invalid number".to_string(),
        };
        assert_eq!(rejected.to_string(), "recipient +15550001 rejected: invalid number");

        let timeout = NotifyError::Timeout(Duration::from_millis(250));
        assert_eq!(timeout.to_string(), "send timed out after 250ms");
    }
}
