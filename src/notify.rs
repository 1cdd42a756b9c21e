use std::env;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::NotifyError;
use crate::report::render_table_html;
use crate::types::CarRow;

/// Largest HTML body accepted by the mail provider
pub const MAX_EMAIL_BYTES: usize = 10_000_000;

pub const EMAIL_CATEGORY: &str = "Car Listings";

/// A composed message, handed to whatever transport delivers it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub html: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub sender: String,
    pub recipient: String,
}

impl EmailSettings {
    /// Reads `EMAIL_SENDER` and `EMAIL_RECIPIENT`; `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let sender = env::var("EMAIL_SENDER").ok().filter(|s| !s.trim().is_empty());
        let recipient = env::var("EMAIL_RECIPIENT").ok().filter(|s| !s.trim().is_empty());
        match (sender, recipient) {
            (Some(sender), Some(recipient)) => Some(Self { sender, recipient }),
            _ => {
                warn!("EMAIL_SENDER/EMAIL_RECIPIENT not configured");
                None
            }
        }
    }
}

/// Build the listing email. Nothing to send yields `Ok(None)`.
pub fn compose_email(
    subject: &str,
    rows: &[CarRow],
    settings: &EmailSettings,
) -> Result<Option<EmailMessage>, NotifyError> {
    if rows.is_empty() {
        info!(subject, "No cars to send");
        return Ok(None);
    }

    let html = render_table_html(rows, "Latest Car Listings");
    let size = html.len();
    info!(subject, size, rows = rows.len(), "Composed email");
    if size > MAX_EMAIL_BYTES {
        return Err(NotifyError::TooLarge {
            size,
            limit: MAX_EMAIL_BYTES,
        });
    }

    Ok(Some(EmailMessage {
        subject: subject.to_string(),
        from: settings.sender.clone(),
        to: settings.recipient.clone(),
        html,
        category: EMAIL_CATEGORY.to_string(),
    }))
}
