//! Invoice numbering and the monthly billing sweeps.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use leadflow_common::types::InvoiceType;
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::{Broker, Invoice, LeadAssignment};
use leadflow_store::{CommissionInvoice, NewInvoice, NewInvoiceItem, Store};
use stripe_client::CreatePaymentLink;

use crate::notify::messages;
use crate::{outbox, Ctx};

/// Invoices fall due 30 days after creation.
pub const DUE_DAYS: i64 = 30;

pub fn format_invoice_number(year: i32, seq: i32) -> String {
    format!("{year}-{seq:04}")
}

/// Allocate the next `YYYY-NNNN` number for the current year.
pub async fn next_invoice_number(store: &Store) -> Result<String> {
    let year = Utc::now().year();
    let seq = store.next_invoice_seq(year).await?;
    Ok(format_invoice_number(year, seq))
}

pub fn default_due_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(DUE_DAYS)
}

#[derive(Debug, Default, serde::Serialize)]
pub struct BillingReport {
    pub invoices_created: usize,
    pub total_cents: i64,
    pub skipped: usize,
    pub failures: usize,
}

#[derive(Clone)]
pub struct BillingService {
    ctx: Ctx,
}

impl BillingService {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }

    /// Bundle every settled-but-uninvoiced commission into one invoice per
    /// broker. The assignments are stamped in the same transaction as the
    /// invoice insert, so a re-run never bills a commission twice.
    pub async fn run_commission_invoices(&self) -> Result<BillingReport> {
        let store = &self.ctx.store;
        let mut report = BillingReport::default();

        let mut by_broker: BTreeMap<Uuid, Vec<LeadAssignment>> = BTreeMap::new();
        for a in store.commissionable_assignments().await? {
            by_broker.entry(a.broker_id).or_default().push(a);
        }

        for (broker_id, assignments) in by_broker {
            let Some(broker) = store.broker(broker_id).await? else {
                warn!(%broker_id, "Commissionable assignments for unknown broker; skipping");
                report.skipped += 1;
                continue;
            };

            let amount_cents: i64 = assignments
                .iter()
                .filter_map(|a| a.commission_amount_cents)
                .sum();
            if amount_cents <= 0 {
                report.skipped += 1;
                continue;
            }

            let mut items = Vec::with_capacity(assignments.len());
            for a in &assignments {
                let label = match store.lead(a.lead_id).await? {
                    Some(lead) => format!("Commission — lead #{}", lead.lead_number),
                    None => "Commission".to_string(),
                };
                items.push(NewInvoiceItem {
                    description: label,
                    quantity: 1,
                    unit_price_cents: a.commission_amount_cents.unwrap_or(0),
                    assignment_id: Some(a.id),
                });
            }

            let number = next_invoice_number(store).await?;
            let invoice = store
                .create_commission_invoice(CommissionInvoice {
                    invoice: NewInvoice {
                        invoice_number: number,
                        broker_id,
                        invoice_type: InvoiceType::Commission,
                        amount_cents,
                        due_date: default_due_date(),
                        description: None,
                        assignment_id: None,
                        package_id: None,
                        items,
                    },
                    assignment_ids: assignments.iter().map(|a| a.id).collect(),
                })
                .await?;

            match self
                .attach_link_and_notify(&broker, &invoice, "Your monthly commission invoice")
                .await
            {
                Ok(()) => {
                    report.invoices_created += 1;
                    report.total_cents += amount_cents;
                }
                Err(e) => {
                    warn!(invoice = %invoice.invoice_number, error = %e, "Commission invoice created but link/notification failed");
                    report.invoices_created += 1;
                    report.total_cents += amount_cents;
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// One subscription invoice per active subscription contract per
    /// calendar month.
    pub async fn run_subscription_invoices(&self) -> Result<BillingReport> {
        let store = &self.ctx.store;
        let mut report = BillingReport::default();

        let today = Utc::now().date_naive();
        let period_start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time")
            .and_utc();
        let period_end = if today.month() == 12 {
            NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
        }
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
        .and_utc();

        for contract in store.active_subscription_contracts().await? {
            let Some(fee) = contract.monthly_fee_cents else {
                report.skipped += 1;
                continue;
            };
            let Some(broker) = store.broker(contract.broker_id).await? else {
                report.skipped += 1;
                continue;
            };
            if store
                .subscription_invoice_exists(contract.broker_id, period_start, period_end)
                .await?
            {
                report.skipped += 1;
                continue;
            }

            let number = next_invoice_number(store).await?;
            let invoice = store
                .insert_invoice(NewInvoice {
                    invoice_number: number,
                    broker_id: contract.broker_id,
                    invoice_type: InvoiceType::Subscription,
                    amount_cents: fee,
                    due_date: default_due_date(),
                    description: None,
                    assignment_id: None,
                    package_id: None,
                    items: vec![NewInvoiceItem {
                        description: format!(
                            "Monthly subscription {}-{:02}",
                            today.year(),
                            today.month()
                        ),
                        quantity: 1,
                        unit_price_cents: fee,
                        assignment_id: None,
                    }],
                })
                .await?;

            match self
                .attach_link_and_notify(&broker, &invoice, "Your monthly subscription invoice")
                .await
            {
                Ok(()) => {
                    report.invoices_created += 1;
                    report.total_cents += fee;
                }
                Err(e) => {
                    warn!(invoice = %invoice.invoice_number, error = %e, "Subscription invoice created but link/notification failed");
                    report.invoices_created += 1;
                    report.total_cents += fee;
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    async fn attach_link_and_notify(
        &self,
        broker: &Broker,
        invoice: &Invoice,
        what: &str,
    ) -> Result<()> {
        let link = self
            .ctx
            .stripe
            .create_payment_link(CreatePaymentLink {
                amount_cents: invoice.amount_cents,
                currency: &self.ctx.currency,
                product_name: &format!("Invoice {}", invoice.invoice_number),
                invoice_id: &invoice.id.to_string(),
                success_url: &payment_success_url(&self.ctx.base_url, &invoice.invoice_number),
            })
            .await
            .map_err(|e| LeadflowError::Payment(e.to_string()))?;

        self.ctx
            .store
            .set_invoice_payment_link(invoice.id, &link.url, &link.id)
            .await?;

        let email = messages::invoice_notice(broker, what, invoice, &link.url, &self.ctx.currency);
        let row = self.ctx.store.enqueue_email(email).await?;
        let _ = outbox::try_send(&self.ctx.store, self.ctx.mailer.as_ref(), &row).await;
        Ok(())
    }
}

/// Where the payment provider redirects the buyer after checkout — the
/// manual-verification fallback endpoint, keyed by invoice number.
pub fn payment_success_url(base_url: &str, invoice_number: &str) -> String {
    format!("{base_url}/payment/success?invoice_number={invoice_number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_numbers_are_year_prefixed_and_zero_padded() {
        assert_eq!(format_invoice_number(2025, 1), "2025-0001");
        assert_eq!(format_invoice_number(2025, 42), "2025-0042");
        assert_eq!(format_invoice_number(2026, 12345), "2026-12345");
    }

    #[test]
    fn success_url_carries_the_invoice_number() {
        assert_eq!(
            payment_success_url("https://api.example.com", "2025-0007"),
            "https://api.example.com/payment/success?invoice_number=2025-0007"
        );
    }
}
