//! Email transport that records messages instead of sending them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hubsweep_core::error::{Error, Result};
use hubsweep_core::{EmailMessage, EmailTransport};

/// [`EmailTransport`] that keeps every accepted message.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failing_recipients: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// All accepted messages, in send order.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("lock").clone()
    }

    /// Accepted messages addressed to `recipient`.
    pub fn sent_to(&self, recipient: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == recipient)
            .collect()
    }

    /// Makes every send to `recipient` fail.
    pub fn fail_for(&self, recipient: impl Into<String>) {
        self.failing_recipients
            .lock()
            .expect("lock")
            .push(recipient.into());
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self
            .failing_recipients
            .lock()
            .expect("lock")
            .contains(&message.to)
        {
            return Err(Error::transport(format!(
                "injected failure for recipient {}",
                message.to
            )));
        }
        self.sent.lock().expect("lock").push(message.clone());
        Ok(())
    }
}
