//! Package distribution: a batch of leads sold together, delivered instantly
//! or spread across business days. Packages created from an explicit lead
//! selection reserve those leads up front and release them all on payment;
//! generic packages pick any eligible leads, oldest first.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use leadflow_common::types::{DistributionType, InvoiceType, LeadStatus, PackageStatus};
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::{Invoice, LeadPackage};
use leadflow_store::{DeliverLeads, NewAssignment, NewInvoice, NewInvoiceItem};
use stripe_client::CreatePaymentLink;

use crate::calendar::{is_weekend, next_weekday};
use crate::invoices::{default_due_date, next_invoice_number, payment_success_url};
use crate::notify::messages;
use crate::states::{ensure_lead, ensure_package};
use crate::tokens::random_token;
use crate::{outbox, Ctx};

/// Reserved-lead packages stash their selection in the invoice description
/// until payment confirms.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReservedLeads {
    pub package_name: String,
    pub lead_ids: Vec<Uuid>,
}

pub struct CreatePackage {
    pub broker_id: Uuid,
    pub name: String,
    pub total_leads: Option<i32>,
    pub price_cents: i64,
    pub distribution_type: DistributionType,
    pub leads_per_day: Option<i32>,
    pub category_id: Option<Uuid>,
    /// Explicit selection: these exact leads are reserved for the package.
    pub lead_ids: Option<Vec<Uuid>>,
}

pub struct PackageOutcome {
    pub package: LeadPackage,
    pub invoice: Invoice,
    pub email_sent: bool,
    pub email_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub package_id: Uuid,
    pub delivered: usize,
    pub delivered_total: i32,
    pub total_leads: i32,
    pub status: PackageStatus,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SweepEntry {
    pub package_id: Uuid,
    pub delivered: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub skipped_weekend: bool,
    pub entries: Vec<SweepEntry>,
}

#[derive(Clone)]
pub struct PackageService {
    ctx: Ctx,
}

impl PackageService {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, req: CreatePackage) -> Result<PackageOutcome> {
        let store = &self.ctx.store;

        let broker = store
            .broker(req.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", req.broker_id)))?;
        if !broker.active {
            return Err(LeadflowError::Validation("broker is inactive".to_string()));
        }
        if req.price_cents <= 0 {
            return Err(LeadflowError::Validation(
                "package price must be positive".to_string(),
            ));
        }

        // Explicit selection fixes the package size and reserves the leads.
        let reserved_ids = match &req.lead_ids {
            Some(ids) if !ids.is_empty() => {
                for lead_id in ids {
                    let lead = store
                        .lead(*lead_id)
                        .await?
                        .ok_or_else(|| LeadflowError::NotFound(format!("lead {lead_id}")))?;
                    ensure_lead(lead.status, LeadStatus::Reserved)?;
                }
                Some(ids.clone())
            }
            _ => None,
        };

        let total_leads = match (&reserved_ids, req.total_leads) {
            (Some(ids), Some(total)) if total != ids.len() as i32 => {
                return Err(LeadflowError::Validation(
                    "total_leads does not match the selected leads".to_string(),
                ));
            }
            (Some(ids), _) => ids.len() as i32,
            (None, Some(total)) if total > 0 => total,
            _ => {
                return Err(LeadflowError::Validation(
                    "total_leads must be positive".to_string(),
                ));
            }
        };
        let leads_per_day = req.leads_per_day.unwrap_or(1);
        if leads_per_day <= 0 {
            return Err(LeadflowError::Validation(
                "leads_per_day must be positive".to_string(),
            ));
        }

        let package = store
            .insert_package(
                req.broker_id,
                req.category_id,
                &req.name,
                total_leads,
                req.price_cents,
                req.distribution_type,
                leads_per_day,
            )
            .await?;

        let description = match &reserved_ids {
            Some(ids) => Some(
                serde_json::to_string(&ReservedLeads {
                    package_name: package.name.clone(),
                    lead_ids: ids.clone(),
                })
                .expect("reserved leads serialize"),
            ),
            None => None,
        };

        let number = next_invoice_number(store).await?;
        let invoice = store
            .insert_invoice(NewInvoice {
                invoice_number: number,
                broker_id: broker.id,
                invoice_type: InvoiceType::Package,
                amount_cents: package.price_cents,
                due_date: default_due_date(),
                description,
                assignment_id: None,
                package_id: Some(package.id),
                items: vec![NewInvoiceItem {
                    description: format!(
                        "Lead package \"{}\" ({} leads)",
                        package.name, package.total_leads
                    ),
                    quantity: 1,
                    unit_price_cents: package.price_cents,
                    assignment_id: None,
                }],
            })
            .await?;

        // No payable link, no package: abort and leave nothing billable.
        let link = match self
            .ctx
            .stripe
            .create_payment_link(CreatePaymentLink {
                amount_cents: invoice.amount_cents,
                currency: &self.ctx.currency,
                product_name: &format!("Lead package \"{}\"", package.name),
                invoice_id: &invoice.id.to_string(),
                success_url: &payment_success_url(&self.ctx.base_url, &invoice.invoice_number),
            })
            .await
        {
            Ok(link) => link,
            Err(e) => {
                warn!(package = %package.id, error = %e, "Payment link creation failed; cancelling package");
                store.cancel_invoice(invoice.id).await?;
                store
                    .set_package_status(package.id, PackageStatus::Cancelled)
                    .await?;
                return Err(LeadflowError::Payment(e.to_string()));
            }
        };
        store
            .set_invoice_payment_link(invoice.id, &link.url, &link.id)
            .await?;

        if let Some(ids) = &reserved_ids {
            store.reserve_leads(ids).await?;
        }

        let email = messages::payment_request(
            &broker,
            &format!("Lead package \"{}\"", package.name),
            &invoice,
            &link.url,
            &self.ctx.currency,
        );
        let row = store.enqueue_email(email).await?;
        let send = outbox::try_send(store, self.ctx.mailer.as_ref(), &row).await;

        Ok(PackageOutcome {
            package,
            invoice,
            email_sent: send.is_ok(),
            email_error: send.err(),
        })
    }

    /// Payment confirmed. Reserved-lead packages deliver their selection at
    /// once and complete; generic packages activate and, when instant,
    /// deliver immediately.
    pub async fn on_paid(&self, invoice: &Invoice, package_id: Uuid) -> Result<()> {
        let store = &self.ctx.store;

        let package = store
            .package(package_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("package {package_id}")))?;

        if matches!(
            package.status,
            PackageStatus::Active | PackageStatus::Completed
        ) {
            // Already processed — the paid-guard upstream makes this rare.
            return Ok(());
        }

        let reserved = invoice
            .description
            .as_deref()
            .and_then(|d| serde_json::from_str::<ReservedLeads>(d).ok())
            .filter(|r| !r.lead_ids.is_empty());

        match reserved {
            Some(reserved) => self.deliver_reserved(&package, reserved).await,
            None => {
                ensure_package(package.status, PackageStatus::Active)?;
                let next = (package.distribution_type == DistributionType::Distributed)
                    .then(|| Utc::now().date_naive());
                store.activate_package(package.id, next).await?;

                if package.distribution_type == DistributionType::Instant {
                    self.deliver(package.id, Some(package.remaining())).await?;
                }
                Ok(())
            }
        }
    }

    async fn deliver_reserved(&self, package: &LeadPackage, reserved: ReservedLeads) -> Result<()> {
        let store = &self.ctx.store;

        let broker = store
            .broker(package.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", package.broker_id)))?;

        let mut leads = Vec::with_capacity(reserved.lead_ids.len());
        for lead_id in &reserved.lead_ids {
            match store.lead(*lead_id).await? {
                Some(lead) => leads.push(lead),
                None => warn!(%lead_id, "Reserved lead vanished before delivery"),
            }
        }

        let unit_price = package.unit_price_cents();
        let assignments = leads
            .iter()
            .map(|lead| NewAssignment {
                lead_id: lead.id,
                broker_id: package.broker_id,
                contract_id: None,
                package_id: Some(package.id),
                pricing_model: leadflow_common::types::PricingModel::Package,
                price_charged_cents: Some(unit_price),
                revenue_share_percent: None,
                status: leadflow_common::types::AssignmentStatus::Sent,
                unlocked: true,
                access_token: random_token(),
                followup_date: None,
            })
            .collect();

        let email = messages::leads_delivered(
            &broker,
            &format!("Your lead package \"{}\"", package.name),
            &leads,
            None,
        );
        let (_, outbox_row) = store.create_sent_assignments(assignments, email).await?;
        store.complete_package(package.id).await?;
        let _ = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;

        Ok(())
    }

    /// One delivery batch. `count` overrides the package's daily rate.
    pub async fn deliver(&self, package_id: Uuid, count: Option<i32>) -> Result<DeliveryReport> {
        let store = &self.ctx.store;

        let package = store
            .package(package_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("package {package_id}")))?;
        if package.status != PackageStatus::Active {
            return Err(LeadflowError::Validation(format!(
                "package is not active (status: {})",
                package.status
            )));
        }

        let remaining = package.remaining();
        let to_deliver = count.unwrap_or(package.leads_per_day).min(remaining);
        if to_deliver <= 0 {
            return Ok(DeliveryReport {
                package_id,
                delivered: 0,
                delivered_total: package.delivered_leads,
                total_leads: package.total_leads,
                status: package.status,
                note: Some("nothing left to deliver".to_string()),
            });
        }

        let next_delivery_date = (package.distribution_type == DistributionType::Distributed)
            .then(|| next_weekday(Utc::now().date_naive()));
        let access_tokens = (0..to_deliver).map(|_| random_token()).collect();

        let delivery = store
            .deliver_package_leads(DeliverLeads {
                package_id,
                broker_id: package.broker_id,
                category_id: package.category_id,
                count: to_deliver,
                unit_price_cents: package.unit_price_cents(),
                access_tokens,
                next_delivery_date,
            })
            .await?;

        if delivery.leads.is_empty() {
            return Ok(DeliveryReport {
                package_id,
                delivered: 0,
                delivered_total: delivery.package.delivered_leads,
                total_leads: delivery.package.total_leads,
                status: delivery.package.status,
                note: Some("no eligible leads available".to_string()),
            });
        }

        let broker = store
            .broker(package.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", package.broker_id)))?;
        let email = messages::leads_delivered(
            &broker,
            &format!("Lead package \"{}\" delivery", package.name),
            &delivery.leads,
            None,
        );
        let row = store.enqueue_email(email).await?;
        let _ = outbox::try_send(store, self.ctx.mailer.as_ref(), &row).await;

        Ok(DeliveryReport {
            package_id,
            delivered: delivery.leads.len(),
            delivered_total: delivery.package.delivered_leads,
            total_leads: delivery.package.total_leads,
            status: delivery.package.status,
            note: None,
        })
    }

    /// The scheduled sweep. Weekends skip entirely; a package with no
    /// eligible leads is reported, not fatal.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let today = Utc::now().date_naive();
        if is_weekend(today) {
            return Ok(SweepReport {
                skipped_weekend: true,
                entries: Vec::new(),
            });
        }

        let due = self.ctx.store.packages_due(today).await?;
        let mut entries = Vec::with_capacity(due.len());
        for package in due {
            match self.deliver(package.id, None).await {
                Ok(report) => entries.push(SweepEntry {
                    package_id: package.id,
                    delivered: report.delivered,
                    error: None,
                }),
                Err(e) => {
                    warn!(package = %package.id, error = %e, "Package delivery failed during sweep");
                    entries.push(SweepEntry {
                        package_id: package.id,
                        delivered: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(SweepReport {
            skipped_weekend: false,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_leads_round_trip_through_the_invoice_description() {
        let reserved = ReservedLeads {
            package_name: "Spring batch".to_string(),
            lead_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        let description = serde_json::to_string(&reserved).unwrap();
        let parsed: ReservedLeads = serde_json::from_str(&description).unwrap();
        assert_eq!(parsed.package_name, "Spring batch");
        assert_eq!(parsed.lead_ids, reserved.lead_ids);
    }

    #[test]
    fn plain_descriptions_are_not_mistaken_for_reservations() {
        let parsed = serde_json::from_str::<ReservedLeads>("10 leads, instant delivery");
        assert!(parsed.is_err());
    }
}
