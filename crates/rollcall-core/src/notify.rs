//! Outbound notifications.
//!
//! Delivery is an external collaborator reached through a plain
//! `(recipient, subject, body)` contract. Callers log delivery failures and
//! carry on; a notification never blocks an attendance update.

use anyhow::Result;
use tracing::info;

pub trait Notifier: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        info!(recipient = %recipient, subject = %subject, body = %body, "Notification");
        Ok(())
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records notifications, optionally failing every send.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn subjects(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, s, _)| s.clone()).collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("mail relay unavailable");
            }
            self.sent.lock().unwrap().push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_builtin_notifiers_never_fail() {
        assert!(TracingNotifier.send("a@example.edu", "s", "b").is_ok());
        assert!(NullNotifier.send("a@example.edu", "s", "b").is_ok());
    }
}
