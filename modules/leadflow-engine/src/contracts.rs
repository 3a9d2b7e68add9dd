//! Contract creation, confirmation and resolution. A contract is born
//! `pending` with a random confirmation token; only the broker's click on
//! the token link activates it, and activation is one-way.

use serde::Serialize;
use uuid::Uuid;

use leadflow_common::types::{ContractStatus, PricingModel};
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::Contract;
use leadflow_store::NewContract;

use crate::notify::messages;
use crate::tokens::{constant_time_eq, random_token};
use crate::{outbox, Ctx};

pub const DEFAULT_FOLLOWUP_DAYS: i32 = 3;

pub struct CreateContract {
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_per_lead_cents: Option<i64>,
    pub monthly_fee_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub followup_days: Option<i32>,
}

pub struct ContractOutcome {
    pub contract: Contract,
    pub email_sent: bool,
    pub email_error: Option<String>,
}

/// What the broker sees behind the confirmation link. No tokens, no broker
/// internals.
#[derive(Debug, Serialize)]
pub struct ContractView {
    pub id: Uuid,
    pub broker_name: String,
    pub category_name: Option<String>,
    pub pricing_model: PricingModel,
    pub price_per_lead_cents: Option<i64>,
    pub monthly_fee_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub followup_days: i32,
    pub status: ContractStatus,
}

#[derive(Clone)]
pub struct ContractService {
    ctx: Ctx,
}

impl ContractService {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, req: CreateContract) -> Result<ContractOutcome> {
        let store = &self.ctx.store;

        let broker = store
            .broker(req.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", req.broker_id)))?;
        if !broker.active {
            return Err(LeadflowError::Validation("broker is inactive".to_string()));
        }
        if let Some(category_id) = req.category_id {
            store
                .category(category_id)
                .await?
                .ok_or_else(|| LeadflowError::NotFound(format!("category {category_id}")))?;
        }

        if !req.pricing_model.valid_for_contract() {
            return Err(LeadflowError::Validation(format!(
                "pricing model {} is not valid for a contract",
                req.pricing_model
            )));
        }
        match req.pricing_model {
            PricingModel::Fixed if req.price_per_lead_cents.unwrap_or(0) <= 0 => {
                return Err(LeadflowError::Validation(
                    "fixed contracts require price_per_lead".to_string(),
                ));
            }
            PricingModel::Subscription if req.monthly_fee_cents.unwrap_or(0) <= 0 => {
                return Err(LeadflowError::Validation(
                    "subscription contracts require monthly_fee".to_string(),
                ));
            }
            PricingModel::RevenueShare => {
                let pct = req.revenue_share_percent.unwrap_or(0.0);
                if !(0.0..=100.0).contains(&pct) || pct == 0.0 {
                    return Err(LeadflowError::Validation(
                        "revenue share contracts require a percent between 0 and 100".to_string(),
                    ));
                }
            }
            _ => {}
        }

        let followup_days = req.followup_days.unwrap_or(DEFAULT_FOLLOWUP_DAYS);
        if followup_days <= 0 {
            return Err(LeadflowError::Validation(
                "followup_days must be positive".to_string(),
            ));
        }

        let contract = store
            .insert_contract(NewContract {
                broker_id: req.broker_id,
                category_id: req.category_id,
                pricing_model: req.pricing_model,
                price_per_lead_cents: req.price_per_lead_cents,
                monthly_fee_cents: req.monthly_fee_cents,
                revenue_share_percent: req.revenue_share_percent,
                followup_days,
                confirmation_token: random_token(),
            })
            .await?;

        let link = format!(
            "{}/api/contracts/{}/confirm/{}",
            self.ctx.base_url, contract.id, contract.confirmation_token
        );
        let email = messages::contract_confirmation(&broker, &contract, &link);
        let row = store.enqueue_email(email).await?;
        let send = outbox::try_send(&self.ctx.store, self.ctx.mailer.as_ref(), &row).await;

        Ok(ContractOutcome {
            contract,
            email_sent: send.is_ok(),
            email_error: send.err(),
        })
    }

    async fn authorized_contract(&self, id: Uuid, token: &str) -> Result<Contract> {
        let contract = self
            .ctx
            .store
            .contract(id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("contract {id}")))?;
        if !constant_time_eq(contract.confirmation_token.as_bytes(), token.as_bytes()) {
            return Err(LeadflowError::Forbidden(
                "confirmation token mismatch".to_string(),
            ));
        }
        Ok(contract)
    }

    /// The sanitized customer-facing view behind the confirmation link.
    pub async fn view(&self, id: Uuid, token: &str) -> Result<ContractView> {
        let contract = self.authorized_contract(id, token).await?;

        let broker = self
            .ctx
            .store
            .broker(contract.broker_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("broker {}", contract.broker_id)))?;
        let category_name = match contract.category_id {
            Some(category_id) => self.ctx.store.category(category_id).await?.map(|c| c.name),
            None => None,
        };

        Ok(ContractView {
            id: contract.id,
            broker_name: broker.name,
            category_name,
            pricing_model: contract.pricing_model,
            price_per_lead_cents: contract.price_per_lead_cents,
            monthly_fee_cents: contract.monthly_fee_cents,
            revenue_share_percent: contract.revenue_share_percent,
            followup_days: contract.followup_days,
            status: contract.status,
        })
    }

    /// One-way confirmation. Re-confirming an active contract is rejected
    /// with no mutation; activating deactivates any prior active contract in
    /// the same scope.
    pub async fn confirm(&self, id: Uuid, token: &str) -> Result<Contract> {
        let contract = self.authorized_contract(id, token).await?;

        match contract.status {
            ContractStatus::Active => Err(LeadflowError::Validation(
                "contract is already active".to_string(),
            )),
            ContractStatus::Inactive => Err(LeadflowError::Validation(
                "contract has been deactivated".to_string(),
            )),
            ContractStatus::Pending => {
                self.ctx
                    .store
                    .activate_contract(contract.id, contract.broker_id, contract.category_id)
                    .await
            }
        }
    }

    /// Category-specific active contract first, broker-wide fallback second,
    /// `None` third — which signals ad-hoc single pricing, not an error.
    pub async fn resolve(
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
}
