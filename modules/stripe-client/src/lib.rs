pub mod error;
pub mod types;

pub use error::{Result, StripeError};
pub use types::{EventData, EventObject, PaymentLink, WebhookEvent};

use hmac::{Hmac, Mac};
use sha2::Sha256;

const BASE_URL: &str = "https://api.stripe.com/v1";

/// Webhook signatures older than this are rejected (replay window).
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
}

pub struct CreatePaymentLink<'a> {
    pub amount_cents: i64,
    pub currency: &'a str,
    pub product_name: &'a str,
    /// Lands in the session metadata so the webhook can resolve the invoice.
    pub invoice_id: &'a str,
    pub success_url: &'a str,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
        }
    }

    /// Create a hosted checkout session for one invoice. The returned URL is
    /// what the broker receives in the payment-request email.
    pub async fn create_payment_link(&self, p: CreatePaymentLink<'_>) -> Result<PaymentLink> {
        let amount = p.amount_cents.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("line_items[0][price_data][currency]", p.currency),
            ("line_items[0][price_data][product_data][name]", p.product_name),
            ("line_items[0][price_data][unit_amount]", &amount),
            ("line_items[0][quantity]", "1"),
            ("metadata[invoice_id]", p.invoice_id),
            ("success_url", p.success_url),
        ];

        let resp = self
            .client
            .post(format!("{BASE_URL}/checkout/sessions"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let link: PaymentLink = resp.json().await?;
        Ok(link)
    }

    /// Verify the `Stripe-Signature` header against the raw request body and
    /// decode the event. Rejects tampered payloads and stale timestamps.
    pub fn parse_webhook(
        payload: &[u8],
        signature_header: &str,
        webhook_secret: &str,
    ) -> Result<WebhookEvent> {
        verify_signature(
            payload,
            signature_header,
            webhook_secret,
            chrono::Utc::now().timestamp(),
        )?;
        let event: WebhookEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }
}

/// Signature scheme: header `t=<unix>,v1=<hex hmac>`, HMAC-SHA256 over
/// `"{t}.{payload}"` keyed by the endpoint secret.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    if candidates.is_empty() {
        return Err(StripeError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if candidates
        .iter()
        .any(|c| constant_time_eq(c.as_bytes(), expected.as_bytes()))
    {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature(
            "signature mismatch".to_string(),
        ))
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, t: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(t.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!("t={t},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        assert!(verify_signature(payload, &header, "whsec_test", 1_700_000_100).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, "whsec_test", 1_700_000_100);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_a", 1_700_000_000);
        assert!(verify_signature(payload, &header, "whsec_b", 1_700_000_100).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        // 10 minutes later — outside the replay window
        assert!(verify_signature(payload, &header, "whsec_test", 1_700_000_600).is_err());
    }

    #[test]
    fn rejects_missing_parts() {
        let payload = b"{}";
        assert!(verify_signature(payload, "v1=deadbeef", "s", 0).is_err());
        assert!(verify_signature(payload, "t=123", "s", 123).is_err());
    }

    #[test]
    fn decodes_event_metadata() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_123",
                "metadata": {"invoice_id": "8d7a"},
                "payment_intent": "pi_9",
                "payment_status": "paid"
            }}
        }"#;
        let event: WebhookEvent = serde_json::from_slice(payload).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.id, "cs_123");
        assert_eq!(
            event.data.object.metadata.get("invoice_id").map(String::as_str),
            Some("8d7a")
        );
    }
}
