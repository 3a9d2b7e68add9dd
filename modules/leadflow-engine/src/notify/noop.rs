use async_trait::async_trait;
use tracing::info;

use super::backend::{Email, Mailer};

/// Logs instead of sending. Selected when no mail provider is configured —
/// local development and tests.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email suppressed (no-op mailer)");
        Ok(())
    }
}
