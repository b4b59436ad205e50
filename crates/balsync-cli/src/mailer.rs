//! Mail delivery for the CLI
//!
//! [`LogMailer`] writes notifications to the log instead of an SMTP relay.
//! Operators forward them with their log pipeline.

use anyhow::{bail, Result};
use tracing::{debug, info};

use balsync_core::config::MailConfig;
use balsync_core::domain::Email;
use balsync_core::ports::{EmailMessage, IMailer};

/// [`IMailer`] logging every message it is asked to send
pub struct LogMailer {
    enabled: bool,
    from: String,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            enabled: config.enabled,
            from: config.from.clone(),
        }
    }
}

#[async_trait::async_trait]
impl IMailer for LogMailer {
    async fn send_mail(&self, message: &EmailMessage, recipients: &[Email]) -> Result<()> {
        if !self.enabled {
            debug!(subject = %message.subject, "Mail disabled, notification dropped");
            return Ok(());
        }
        if recipients.is_empty() {
            bail!("No recipient for \"{}\"", message.subject);
        }

        let to: Vec<&str> = recipients.iter().map(|e| e.as_str()).collect();
        info!(
            from = %self.from,
            to = %to.join(", "),
            subject = %message.subject,
            body = %message.text,
            "Notification mail"
        );
        Ok(())
    }
}
