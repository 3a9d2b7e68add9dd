//! Payment confirmation. Two entry points — the provider webhook and the
//! manual verify-by-invoice-number fallback — converge on one idempotent
//! settle path: a guarded paid transition, then delivery dispatch by invoice
//! type. Re-confirming a paid invoice is a successful no-op.

use tracing::{info, warn};

use leadflow_common::types::{AssignmentStatus, InvoiceStatus, InvoiceType};
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::Invoice;
use stripe_client::{StripeClient, StripeError, WebhookEvent};

use crate::notify::messages;
use crate::packages::PackageService;
use crate::states::ensure_invoice;
use crate::{outbox, Ctx};

/// The event type that settles an invoice.
const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug)]
pub enum Confirmation {
    /// Freshly settled; delivery was dispatched.
    Paid(Invoice),
    /// Idempotent re-confirmation; nothing was mutated.
    AlreadyPaid(Invoice),
    /// An event type this system does not act on.
    Ignored,
}

#[derive(Clone)]
pub struct PaymentService {
    ctx: Ctx,
    packages: PackageService,
}

impl PaymentService {
    pub fn new(ctx: Ctx, packages: PackageService) -> Self {
        Self { ctx, packages }
    }

    /// Webhook path: verify the provider signature over the raw body, then
    /// resolve the invoice from event metadata — or, if absent, from the
    /// stored payment-link identifier.
    pub async fn confirm_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
        webhook_secret: &str,
    ) -> Result<Confirmation> {
        let event = StripeClient::parse_webhook(payload, signature_header, webhook_secret)
            .map_err(|e| match e {
                StripeError::InvalidSignature(msg) => LeadflowError::Forbidden(msg),
                other => LeadflowError::Validation(other.to_string()),
            })?;

        if event.event_type != CHECKOUT_COMPLETED {
            info!(event_type = %event.event_type, "Ignoring payment event");
            return Ok(Confirmation::Ignored);
        }

        let invoice = self.resolve_invoice(&event).await?;
        let payment_id = event
            .data
            .object
            .payment_intent
            .clone()
            .unwrap_or_else(|| event.data.object.id.clone());

        self.settle(invoice, Some(&payment_id)).await
    }

    /// Manual fallback for when the webhook did not fire, keyed by invoice
    /// number (the buyer's post-payment redirect carries it).
    pub async fn verify_by_number(&self, invoice_number: &str) -> Result<Confirmation> {
        let invoice = self
            .ctx
            .store
            .invoice_by_number(invoice_number)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("invoice {invoice_number}")))?;
        self.settle(invoice, None).await
    }

    async fn resolve_invoice(&self, event: &WebhookEvent) -> Result<Invoice> {
        let store = &self.ctx.store;

        if let Some(invoice_id) = event.data.object.metadata.get("invoice_id") {
            if let Ok(id) = invoice_id.parse() {
                if let Some(invoice) = store.invoice(id).await? {
                    return Ok(invoice);
                }
            }
        }
        store
            .invoice_by_payment_link(&event.data.object.id)
            .await?
            .ok_or_else(|| {
                LeadflowError::NotFound(format!(
                    "no invoice for payment event {}",
                    event.data.object.id
                ))
            })
    }

    async fn settle(&self, invoice: Invoice, payment_id: Option<&str>) -> Result<Confirmation> {
        match invoice.status {
            InvoiceStatus::Paid => {
                info!(invoice = %invoice.invoice_number, "Invoice already paid; no-op");
                return Ok(Confirmation::AlreadyPaid(invoice));
            }
            InvoiceStatus::Cancelled => {
                return Err(LeadflowError::Validation(format!(
                    "invoice {} is cancelled",
                    invoice.invoice_number
                )));
            }
            InvoiceStatus::Pending | InvoiceStatus::Sent => {
                ensure_invoice(invoice.status, InvoiceStatus::Paid)?;
            }
        }

        // The guarded UPDATE is the idempotency hinge: losing a race with a
        // concurrent confirmation means the other call dispatched delivery.
        let Some(paid) = self
            .ctx
            .store
            .mark_invoice_paid(invoice.id, payment_id)
            .await?
        else {
            info!(invoice = %invoice.invoice_number, "Invoice settled concurrently; no-op");
            return Ok(Confirmation::AlreadyPaid(invoice));
        };

        info!(invoice = %paid.invoice_number, invoice_type = %paid.invoice_type, "Invoice paid");
        self.dispatch_delivery(&paid).await?;

        Ok(Confirmation::Paid(paid))
    }

    /// What a paid invoice releases depends on its type.
    async fn dispatch_delivery(&self, invoice: &Invoice) -> Result<()> {
        match invoice.invoice_type {
            InvoiceType::Single | InvoiceType::Fixed => self.deliver_assignment(invoice).await,
            InvoiceType::Package => match invoice.package_id {
                Some(package_id) => self.packages.on_paid(invoice, package_id).await,
                None => {
                    warn!(invoice = %invoice.invoice_number, "Package invoice without package_id");
                    Ok(())
                }
            },
            // Nothing to deliver — the leads went out long ago.
            InvoiceType::Subscription | InvoiceType::Commission => Ok(()),
        }
    }

    async fn deliver_assignment(&self, invoice: &Invoice) -> Result<()> {
        let store = &self.ctx.store;

        let Some(assignment_id) = invoice.assignment_id else {
            // Consolidated fixed-bulk invoices deliver at assignment time.
            return Ok(());
        };
        let Some(assignment) = store.assignment(assignment_id).await? else {
            warn!(invoice = %invoice.invoice_number, %assignment_id, "Paid invoice references missing assignment");
            return Ok(());
        };
        if assignment.status != AssignmentStatus::Pending {
            // Already delivered.
            return Ok(());
        }

        let lead = store
            .lead(assignment.lead_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("lead {}", assignment.lead_id)))?;
        let broker = store
            .broker(assignment.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", assignment.broker_id)))?;

        let email = messages::lead_delivered(&broker, &lead, Some(assignment.id));
        if let Some((_, outbox_row)) = store.deliver_assignment(assignment.id, email).await? {
            let _ = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;
        }

        Ok(())
    }
}
