//! The assignment engine: hand a lead to a broker under priced terms.
//! Fixed and single purchases gate delivery behind payment; revenue-share
//! and subscription deliver immediately. Bulk assignment batches the
//! notification into one consolidated email.

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use leadflow_common::types::{AssignmentStatus, InvoiceType, PricingModel};
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::{Broker, Contract, Invoice, Lead, LeadAssignment};
use leadflow_store::{NewAssignment, NewInvoice, NewInvoiceItem};
use stripe_client::CreatePaymentLink;

use crate::calendar::add_business_days;
use crate::contracts::DEFAULT_FOLLOWUP_DAYS;
use crate::invoices::{default_due_date, next_invoice_number, payment_success_url};
use crate::notify::messages;
use crate::tokens::random_token;
use crate::{outbox, Ctx};

pub struct AssignRequest {
    pub lead_id: Uuid,
    pub broker_id: Uuid,
    /// Explicit terms override contract resolution.
    pub pricing_model: Option<PricingModel>,
    pub price_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
}

pub struct AssignBulkRequest {
    pub lead_ids: Vec<Uuid>,
    pub broker_id: Uuid,
    pub pricing_model: Option<PricingModel>,
    pub price_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
}

pub struct AssignOutcome {
    pub assignment: LeadAssignment,
    pub invoice: Option<Invoice>,
    pub email_sent: bool,
    pub email_error: Option<String>,
}

pub struct AssignBulkOutcome {
    pub assignments: Vec<LeadAssignment>,
    pub invoice: Option<Invoice>,
    pub email_sent: bool,
    pub email_error: Option<String>,
}

/// Priced terms for one assignment, either from an active contract or from
/// the caller's explicit ad-hoc pricing.
struct Terms {
    model: PricingModel,
    contract: Option<Contract>,
    price_cents: Option<i64>,
    revenue_share_percent: Option<f64>,
    followup_days: i32,
}

#[derive(Clone)]
pub struct AssignmentEngine {
    ctx: Ctx,
}

impl AssignmentEngine {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }

    pub async fn assign(&self, req: AssignRequest) -> Result<AssignOutcome> {
        let store = &self.ctx.store;

        let lead = store
            .lead(req.lead_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("lead {}", req.lead_id)))?;
        let broker = self.load_broker(req.broker_id).await?;

        if !lead.status.is_assignable() {
            return Err(LeadflowError::Validation(format!(
                "lead #{} is not assignable (status: {})",
                lead.lead_number, lead.status
            )));
        }

        let terms = self
            .resolve_terms(
                req.broker_id,
                lead.category_id,
                req.pricing_model,
                req.price_cents,
                req.revenue_share_percent,
            )
            .await?;

        if terms.model.payment_gated() {
            self.assign_gated(&lead, &broker, &terms).await
        } else {
            self.assign_immediate(&lead, &broker, &terms).await
        }
    }

    /// Bulk assignment for the immediate-delivery paths (revenue-share,
    /// subscription, and fixed-bulk with one consolidated invoice). Ad-hoc
    /// `single` purchases stay per-lead.
    pub async fn assign_bulk(&self, req: AssignBulkRequest) -> Result<AssignBulkOutcome> {
        let store = &self.ctx.store;

        if req.lead_ids.is_empty() {
            return Err(LeadflowError::Validation("lead_ids is empty".to_string()));
        }
        let broker = self.load_broker(req.broker_id).await?;

        let mut leads = Vec::with_capacity(req.lead_ids.len());
        for lead_id in &req.lead_ids {
            let lead = store
                .lead(*lead_id)
                .await?
                .ok_or_else(|| LeadflowError::NotFound(format!("lead {lead_id}")))?;
            if !lead.status.is_assignable() {
                return Err(LeadflowError::Validation(format!(
                    "lead #{} is not assignable (status: {})",
                    lead.lead_number, lead.status
                )));
            }
            leads.push(lead);
        }

        let terms = self
            .resolve_terms(
                req.broker_id,
                leads[0].category_id,
                req.pricing_model,
                req.price_cents,
                req.revenue_share_percent,
            )
            .await?;

        if terms.model == PricingModel::Single {
            return Err(LeadflowError::Validation(
                "bulk assignment requires a contract-backed pricing model".to_string(),
            ));
        }

        // Fixed-bulk delivers immediately but bills the whole batch on one
        // consolidated invoice with a payment link.
        let (invoice, note) = if terms.model == PricingModel::Fixed {
            let price = terms.price_cents.expect("validated fixed price");
            let items = leads
                .iter()
                .map(|lead| NewInvoiceItem {
                    description: format!("Lead #{}", lead.lead_number),
                    quantity: 1,
                    unit_price_cents: price,
                    assignment_id: None,
                })
                .collect();
            let number = next_invoice_number(store).await?;
            let invoice = store
                .insert_invoice(NewInvoice {
                    invoice_number: number,
                    broker_id: broker.id,
                    invoice_type: InvoiceType::Fixed,
                    amount_cents: price * leads.len() as i64,
                    due_date: default_due_date(),
                    description: None,
                    assignment_id: None,
                    package_id: None,
                    items,
                })
                .await?;

            let link = match self.create_link(&invoice, "leads").await {
                Ok(link) => link,
                Err(e) => {
                    store.cancel_invoice(invoice.id).await?;
                    return Err(e);
                }
            };
            store
                .set_invoice_payment_link(invoice.id, &link.url, &link.id)
                .await?;
            let note = format!(
                "Payment link for invoice {}: {}",
                invoice.invoice_number, link.url
            );
            (Some(invoice), Some(note))
        } else {
            (None, None)
        };

        let followup_date = (terms.model == PricingModel::RevenueShare)
            .then(|| add_business_days(Utc::now().date_naive(), terms.followup_days as u32));

        let assignments = leads
            .iter()
            .map(|lead| NewAssignment {
                lead_id: lead.id,
                broker_id: broker.id,
                contract_id: terms.contract.as_ref().map(|c| c.id),
                package_id: None,
                pricing_model: terms.model,
                price_charged_cents: terms.price_cents,
                revenue_share_percent: terms.revenue_share_percent,
                status: AssignmentStatus::Sent,
                unlocked: true,
                access_token: random_token(),
                followup_date,
            })
            .collect();

        let email = messages::leads_delivered(&broker, "Your new leads", &leads, note.as_deref());
        let (created, outbox_row) = store.create_sent_assignments(assignments, email).await?;
        let send = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;

        Ok(AssignBulkOutcome {
            assignments: created,
            invoice,
            email_sent: send.is_ok(),
            email_error: send.err(),
        })
    }

    async fn load_broker(&self, broker_id: Uuid) -> Result<Broker> {
        let broker = self
            .ctx
            .store
            .broker(broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {broker_id}")))?;
        if !broker.active {
            return Err(LeadflowError::Validation("broker is inactive".to_string()));
        }
        Ok(broker)
    }

    async fn resolve_terms(
        &self,
        broker_id: Uuid,
        category_id: Option<Uuid>,
        model: Option<PricingModel>,
        price_cents: Option<i64>,
        revenue_share_percent: Option<f64>,
    ) -> Result<Terms> {
        let terms = match model {
            // Explicit terms from the caller.
            Some(PricingModel::Package) => {
                return Err(LeadflowError::Validation(
                    "package pricing is only created through package purchases".to_string(),
                ));
            }
            Some(model) => Terms {
                model,
                contract: None,
                price_cents,
                revenue_share_percent,
                followup_days: DEFAULT_FOLLOWUP_DAYS,
            },
            // No explicit terms: resolve the broker's contract; no contract
            // means an ad-hoc single purchase at the caller's price.
            None => {
                let contract = self.resolve_contract(broker_id, category_id).await?;
                match contract {
                    Some(c) => Terms {
                        model: c.pricing_model,
                        price_cents: c.price_per_lead_cents,
                        revenue_share_percent: c.revenue_share_percent,
                        followup_days: c.followup_days,
                        contract: Some(c),
                    },
                    None => Terms {
                        model: PricingModel::Single,
                        contract: None,
                        price_cents,
                        revenue_share_percent: None,
                        followup_days: DEFAULT_FOLLOWUP_DAYS,
                    },
                }
            }
        };

        match terms.model {
            PricingModel::Fixed | PricingModel::Single
                if terms.price_cents.unwrap_or(0) <= 0 =>
            {
                Err(LeadflowError::Validation(
                    "a positive price is required for this assignment".to_string(),
                ))
            }
            PricingModel::RevenueShare if terms.revenue_share_percent.unwrap_or(0.0) <= 0.0 => {
                Err(LeadflowError::Validation(
                    "revenue_share_percent is required for revenue share assignments".to_string(),
                ))
            }
            _ => Ok(terms),
        }
    }

    async fn resolve_contract(
        &self,
        broker_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Option<Contract>> {
        if let Some(category) = category_id {
            if let Some(contract) = self
                .ctx
                .store
                .active_contract(broker_id, Some(category))
                .await?
            {
                return Ok(Some(contract));
            }
        }
        self.ctx.store.active_contract(broker_id, None).await
    }

    /// Payment precedes delivery: invoice first, then the payment link (a
    /// link failure aborts the whole assignment), then — atomically — the
    /// locked pending assignment, the reserved lead, and the notification.
    async fn assign_gated(
        &self,
        lead: &Lead,
        broker: &Broker,
        terms: &Terms,
    ) -> Result<AssignOutcome> {
        let store = &self.ctx.store;
        let price = terms.price_cents.expect("validated gated price");

        let invoice_type = match terms.model {
            PricingModel::Fixed => InvoiceType::Fixed,
            _ => InvoiceType::Single,
        };
        let number = next_invoice_number(store).await?;
        let invoice = store
            .insert_invoice(NewInvoice {
                invoice_number: number,
                broker_id: broker.id,
                invoice_type,
                amount_cents: price,
                due_date: default_due_date(),
                description: None,
                assignment_id: None,
                package_id: None,
                items: vec![NewInvoiceItem {
                    description: format!("Lead #{}", lead.lead_number),
                    quantity: 1,
                    unit_price_cents: price,
                    assignment_id: None,
                }],
            })
            .await?;

        // A broker billed with no way to pay is worse than no assignment at
        // all: a failed link cancels the invoice and aborts.
        let link = match self
            .create_link(&invoice, &format!("Lead #{}", lead.lead_number))
            .await
        {
            Ok(link) => link,
            Err(e) => {
                warn!(invoice = %invoice.invoice_number, error = %e, "Payment link creation failed; aborting assignment");
                store.cancel_invoice(invoice.id).await?;
                return Err(e);
            }
        };

        let email = messages::payment_request(
            broker,
            &format!("Lead #{}", lead.lead_number),
            &invoice,
            &link.url,
            &self.ctx.currency,
        );
        let (assignment, outbox_row) = store
            .create_pending_assignment(
                NewAssignment {
                    lead_id: lead.id,
                    broker_id: broker.id,
                    contract_id: terms.contract.as_ref().map(|c| c.id),
                    package_id: None,
                    pricing_model: terms.model,
                    price_charged_cents: Some(price),
                    revenue_share_percent: None,
                    status: AssignmentStatus::Pending,
                    unlocked: false,
                    access_token: random_token(),
                    followup_date: None,
                },
                invoice.id,
                &link.url,
                &link.id,
                email,
            )
            .await?;

        let send = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;

        Ok(AssignOutcome {
            assignment,
            invoice: Some(invoice),
            email_sent: send.is_ok(),
            email_error: send.err(),
        })
    }

    /// Commission and subscription models deliver at once: sent + unlocked
    /// assignment, lead assigned, full contact data in the notification.
    async fn assign_immediate(
        &self,
        lead: &Lead,
        broker: &Broker,
        terms: &Terms,
    ) -> Result<AssignOutcome> {
        let store = &self.ctx.store;

        let followup_date = (terms.model == PricingModel::RevenueShare)
            .then(|| add_business_days(Utc::now().date_naive(), terms.followup_days as u32));

        let assignment = NewAssignment {
            lead_id: lead.id,
            broker_id: broker.id,
            contract_id: terms.contract.as_ref().map(|c| c.id),
            package_id: None,
            pricing_model: terms.model,
            price_charged_cents: terms.price_cents,
            revenue_share_percent: terms.revenue_share_percent,
            status: AssignmentStatus::Sent,
            unlocked: true,
            access_token: random_token(),
            followup_date,
        };

        let email = messages::lead_delivered(broker, lead, None);
        let (mut created, outbox_row) = store
            .create_sent_assignments(vec![assignment], email)
            .await?;
        let assignment = created.pop().expect("one assignment inserted");

        let send = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;

        Ok(AssignOutcome {
            assignment,
            invoice: None,
            email_sent: send.is_ok(),
            email_error: send.err(),
        })
    }

    async fn create_link(
        &self,
        invoice: &Invoice,
        product: &str,
    ) -> Result<stripe_client::PaymentLink> {
        self.ctx
            .stripe
            .create_payment_link(CreatePaymentLink {
                amount_cents: invoice.amount_cents,
                currency: &self.ctx.currency,
                product_name: product,
                invoice_id: &invoice.id.to_string(),
                success_url: &payment_success_url(&self.ctx.base_url, &invoice.invoice_number),
            })
            .await
            .map_err(|e| LeadflowError::Payment(e.to_string()))
    }
}
