//! Outbound email interface.
//!
//! Delivery (the portal's email endpoint, an SMTP relay, ...) is an external
//! collaborator; the sweeps hand it fully rendered messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A rendered email addressed by platform username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    /// Recipient username.
    pub to: String,
    /// Sender username.
    pub from: String,
    /// Optional cc username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Delivers rendered emails.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}
