//! User and admin notifications.
//!
//! [`Notifier`] renders the storage emails and hands them to an
//! [`EmailTransport`]. In dry-run mode the rendered message is logged and
//! nothing is sent.

use std::fmt::Write as _;
use std::sync::Arc;

use hubsweep_core::{EmailMessage, EmailTransport, LifecycleTimeline, Result, SweepConfig};

use crate::report::{ReportRow, SweepKind};

/// Subject of the storage warning email.
pub const WARNING_SUBJECT: &str = "OpenScienceLab Notification - Storage Warning";

/// Subject of the storage deletion email.
pub const DELETION_SUBJECT: &str = "OpenScienceLab Notification - Storage Deleted";

/// Renders and sends sweep emails.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn EmailTransport>,
    admin_username: String,
    cluster_name: String,
    lab_name: String,
    portal_domain: String,
    cron_utc_hour: u32,
    dry_run: bool,
}

impl Notifier {
    /// Creates a notifier for the lab described by `config`.
    #[must_use]
    pub fn new(transport: Arc<dyn EmailTransport>, config: &SweepConfig) -> Self {
        Self {
            transport,
            admin_username: config.admin_username.clone(),
            cluster_name: config.cluster_name.clone(),
            lab_name: config.lab_name().to_string(),
            portal_domain: config.portal_domain.clone(),
            cron_utc_hour: config.snapshot_cron_utc_hour,
            dry_run: config.dry_run,
        }
    }

    /// Warns `username` that their storage will be deleted on the
    /// timeline's snapshot deletion day.
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    pub async fn send_warning(&self, username: &str, timeline: &LifecycleTimeline) -> Result<()> {
        let deletion_at = format!(
            "{} {}:00 UTC",
            timeline.snapshot_delete_date(),
            self.cron_utc_hour
        );
        let body = format!(
            "<p>Hello {username},</p>\
             <p>In order to conserve space and costs for OpenScienceLab, user storage is set to be \
             deleted after a period of inactivity. Your user storage for lab '<b>{lab}</b>' is set \
             to be permanently deleted on {deletion_at} unless further action is taken. Your \
             OpenScienceLab username and password will not be changed.</p>\
             <p>To stop this from happening, log into <a href=\"{portal}\">OpenScienceLab</a>, \
             click the <i>Go to lab</i> button for lab '{lab}', then click on \
             <i>Start My Server</i>. No other action is required. Do not forget to stop your \
             server when done.</p>\
             <p>Thank you,<br/>Your OpenScienceLab Team</p>",
            username = escape_html(username),
            lab = escape_html(&self.lab_name),
            portal = escape_html(&self.portal_domain),
        );
        self.send_user_email(username, WARNING_SUBJECT, body, "warning")
            .await
    }

    /// Tells `username` that their storage has been deleted.
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    pub async fn send_deletion(&self, username: &str) -> Result<()> {
        let body = format!(
            "<p>Hello {username},</p>\
             <p>In order to conserve space and costs for OpenScienceLab, user storage is set to be \
             deleted after a period of inactivity. To enforce this, your storage for lab \
             '<b>{lab}</b>' has been permanently deleted and cannot be retrieved. Your \
             OpenScienceLab username and password have not changed.</p>\
             <p>Thank you,<br/>Your OpenScienceLab Team</p>",
            username = escape_html(username),
            lab = escape_html(&self.lab_name),
        );
        self.send_user_email(username, DELETION_SUBJECT, body, "deletion")
            .await
    }

    /// Sends an email to a user, copying the admin.
    ///
    /// `template` labels the metric.
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    pub async fn send_user_email(
        &self,
        username: &str,
        subject: &str,
        html_body: String,
        template: &'static str,
    ) -> Result<()> {
        let message = EmailMessage {
            to: username.to_string(),
            from: self.admin_username.clone(),
            cc: Some(self.admin_username.clone()),
            subject: subject.to_string(),
            html_body,
        };
        self.deliver(&message, template).await
    }

    /// Sends the aggregated error report for one run to the admin.
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    pub async fn send_admin_report(&self, kind: SweepKind, rows: &[ReportRow]) -> Result<()> {
        let mut table = String::new();
        for row in rows {
            let _ = write!(
                table,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape_html(&row.resource_id),
                escape_html(&row.message)
            );
        }
        let message = EmailMessage {
            to: self.admin_username.clone(),
            from: self.admin_username.clone(),
            cc: None,
            subject: format!("OpenScienceLab {} CronJob Errors", kind.report_name()),
            html_body: format!(
                "<p>The following are errors for lab '{cluster}' encountered while running the \
                 {kind} cronjob.</p><table>{table}</table>",
                cluster = escape_html(&self.cluster_name),
                kind = kind.as_str(),
            ),
        };
        self.deliver(&message, "admin_report").await
    }

    async fn deliver(&self, message: &EmailMessage, template: &'static str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                body = %message.html_body,
                "dry run: email not sent"
            );
            return Ok(());
        }
        self.transport.send(message).await?;
        tracing::info!(to = %message.to, subject = %message.subject, "email sent");
        crate::metrics::record_email(template);
        Ok(())
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("admin_username", &self.admin_username)
            .field("lab_name", &self.lab_name)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
