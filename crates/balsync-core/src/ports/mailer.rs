//! Mail port (driven/secondary port)
//!
//! Best-effort delivery of notification emails to the addresses
//! registered on a dataset.
//!
//! ## Design Notes
//!
//! - Delivery failures are returned to the caller, which logs them;
//!   a failed mail never rolls back the operation that triggered it.

use serde::{Deserialize, Serialize};

use crate::domain::{newtypes::Email, BaseLocale};

/// A formatted message ready to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub text: String,
}

impl EmailMessage {
    /// Creates a message with the given subject and body
    pub fn new(subject: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
        }
    }

    /// Notification sent after the first publication of a dataset
    pub fn publication_notification(bal: &BaseLocale) -> Self {
        let nom = if bal.nom().is_empty() {
            format!("commune {}", bal.commune())
        } else {
            bal.nom().to_string()
        };
        Self::new(
            "Publication de votre Base Adresse Locale",
            format!(
                "Bonjour,\n\n\
                 La Base Adresse Locale « {nom} » (commune {commune}) vient d’être publiée \
                 dans la Base Adresse Nationale.\n\n\
                 Les prochaines modifications seront synchronisées automatiquement.\n",
                commune = bal.commune(),
            ),
        )
    }
}

/// Port trait for mail delivery
#[async_trait::async_trait]
pub trait IMailer: Send + Sync {
    /// Sends `message` to every recipient
    async fn send_mail(&self, message: &EmailMessage, recipients: &[Email]) -> anyhow::Result<()>;
}
