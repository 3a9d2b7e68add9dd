//! Domain services for the brokerage workflow: ingestion, contract
//! resolution, assignment, invoicing and payment, package distribution and
//! the revenue-share follow-up loop. Everything stateful goes through
//! `leadflow_store`; everything outbound goes through the `Mailer` backend
//! or the payment-provider client.

pub mod assign;
pub mod calendar;
pub mod contracts;
pub mod fieldmap;
pub mod followup;
pub mod ingest;
pub mod invoices;
pub mod notify;
pub mod outbox;
pub mod packages;
pub mod payments;
pub mod states;
pub mod tokens;

use std::sync::Arc;

use leadflow_store::Store;
use stripe_client::StripeClient;

use crate::notify::Mailer;

/// Everything the services share. Cheap to clone.
#[derive(Clone)]
pub struct Ctx {
    pub store: Store,
    pub mailer: Arc<dyn Mailer>,
    pub stripe: Arc<StripeClient>,
    /// Base URL for customer-facing links embedded in emails.
    pub base_url: String,
    pub currency: String,
}

/// The wired-up service set the API binary hangs onto.
#[derive(Clone)]
pub struct Services {
    pub ingest: ingest::IngestService,
    pub contracts: contracts::ContractService,
    pub assignments: assign::AssignmentEngine,
    pub payments: payments::PaymentService,
    pub packages: packages::PackageService,
    pub followups: followup::FollowupService,
    pub billing: invoices::BillingService,
}

impl Services {
    pub fn new(ctx: Ctx) -> Self {
        let packages = packages::PackageService::new(ctx.clone());
        Self {
            ingest: ingest::IngestService::new(ctx.clone()),
            contracts: contracts::ContractService::new(ctx.clone()),
            assignments: assign::AssignmentEngine::new(ctx.clone()),
            payments: payments::PaymentService::new(ctx.clone(), packages.clone()),
            followups: followup::FollowupService::new(ctx.clone()),
            billing: invoices::BillingService::new(ctx.clone()),
            packages,
        }
    }
}
