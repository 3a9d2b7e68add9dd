use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::backend::{Email, Mailer};

const API_URL: &str = "https://api.postmarkapp.com/email";

/// Postmark transactional-email backend.
pub struct PostmarkMailer {
    token: String,
    from: String,
    http: reqwest::Client,
}

impl PostmarkMailer {
    pub fn new(token: String, from: String) -> Self {
        Self {
            token,
            from,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for PostmarkMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        let payload = json!({
            "From": self.from,
            "To": email.to,
            "Subject": email.subject,
            "TextBody": email.body,
            "MessageStream": "outbound",
        });

        let resp = self
            .http
            .post(API_URL)
            .header("X-Postmark-Server-Token", &self.token)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Postmark returned non-success");
            anyhow::bail!("Postmark returned {status}");
        }

        Ok(())
    }
}
