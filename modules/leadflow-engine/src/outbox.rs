//! Outbox dispatch. Primary mutations enqueue durable rows; delivery is
//! best-effort inline (so API responses can report `email_sent`) plus a
//! retrying sweep. A failed send never touches the primary record.

use tracing::warn;

use leadflow_store::models::OutboxEmail;
use leadflow_store::Store;

use crate::notify::{Email, Mailer};

/// Rows past this many failed attempts are left for operator attention.
pub const MAX_ATTEMPTS: i32 = 5;

const SWEEP_BATCH: i64 = 100;

#[derive(Debug, Default, serde::Serialize)]
pub struct OutboxReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Try to deliver one outbox row right now. A failure is recorded on the row
/// (for the retry sweep) and returned so callers can report `email_error`.
pub async fn try_send(
    store: &Store,
    mailer: &dyn Mailer,
    email: &OutboxEmail,
) -> std::result::Result<(), String> {
    let message = Email {
        to: email.recipient.clone(),
        subject: email.subject.clone(),
        body: email.body.clone(),
    };

    match mailer.send(&message).await {
        Ok(()) => {
            if let Err(e) = store.mark_email_sent(email.id).await {
                warn!(email_id = %email.id, error = %e, "Email sent but not marked; sweep may resend");
            }
            Ok(())
        }
        Err(e) => {
            warn!(email_id = %email.id, kind = %email.kind, error = %e, "Email delivery failed");
            if let Err(e) = store.mark_email_failed(email.id, &e.to_string()).await {
                warn!(email_id = %email.id, error = %e, "Failed to record email failure");
            }
            Err(e.to_string())
        }
    }
}

/// Drain pending rows, oldest first.
pub async fn dispatch_pending(
    store: &Store,
    mailer: &dyn Mailer,
) -> leadflow_common::Result<OutboxReport> {
    let pending = store.pending_emails(MAX_ATTEMPTS, SWEEP_BATCH).await?;
    let mut report = OutboxReport {
        attempted: pending.len(),
        ..Default::default()
    };

    for email in &pending {
        match try_send(store, mailer, email).await {
            Ok(()) => report.sent += 1,
            Err(_) => report.failed += 1,
        }
    }

    Ok(report)
}
