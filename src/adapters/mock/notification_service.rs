use crate::ports::notifier::{Notifier, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// A reminder handed to the mock notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReminder {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Mock implementation of Notifier
///
/// Does not deliver any mail. Each reminder is logged and recorded so callers
/// can inspect what would have been sent. Addresses registered with
/// [`NotificationService::fail_for`] are rejected to simulate delivery failures.
#[derive(Default)]
pub struct NotificationService {
    sent: Mutex<Vec<SentReminder>>,
    failing: Mutex<HashSet<String>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `email` fail
    pub fn fail_for(&self, email: impl Into<String>) {
        self.failing.lock().unwrap().insert(email.into());
    }

    /// Reminders accepted so far, in send order
    pub fn sent(&self) -> Vec<SentReminder> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn send_reminder(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(to_email) {
            return Err(format!("mail delivery to {} failed", to_email).into());
        }

        tracing::info!("Sending email to {}: {}\n{}", to_email, subject, body);

        self.sent.lock().unwrap().push(SentReminder {
            to_email: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
