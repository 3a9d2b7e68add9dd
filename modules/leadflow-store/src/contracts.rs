use uuid::Uuid;

use leadflow_common::types::PricingModel;
use leadflow_common::{LeadflowError, Result};

use crate::models::Contract;
use crate::{is_unique_violation, Store};

/// Stand-in for a NULL category in the one-active-per-scope index.
const NO_CATEGORY: Uuid = Uuid::nil();

pub struct NewContract {
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_per_lead_cents: Option<i64>,
    pub monthly_fee_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub followup_days: i32,
    pub confirmation_token: String,
}

impl Store {
    pub async fn insert_contract(&self, c: NewContract) -> Result<Contract> {
        let row = sqlx::query_as::<_, Contract>(
            r#"
            INSERT INTO contracts
                (broker_id, category_id, pricing_model, price_per_lead_cents,
                 monthly_fee_cents, revenue_share_percent, followup_days,
                 confirmation_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(c.broker_id)
        .bind(c.category_id)
        .bind(c.pricing_model)
        .bind(c.price_per_lead_cents)
        .bind(c.monthly_fee_cents)
        .bind(c.revenue_share_percent)
        .bind(c.followup_days)
        .bind(&c.confirmation_token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let row = sqlx::query_as::<_, Contract>("SELECT * FROM contracts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// The active contract for an exact (broker, category scope) pair.
    /// `None` category means the broker-wide contract.
    pub async fn active_contract(
        &self,
        broker_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Option<Contract>> {
        let row = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE broker_id = $1
              AND status = 'active'
              AND COALESCE(category_id, $3) = COALESCE($2, $3)
            LIMIT 1
            "#,
        )
        .bind(broker_id)
        .bind(category_id)
        .bind(NO_CATEGORY)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Activate a confirmed contract, deactivating any prior active contract
    /// for the same (broker, category) scope in the same transaction. The
    /// partial unique index backstops concurrent confirmations; losing the
    /// race surfaces as `Conflict`.
    pub async fn activate_contract(
        &self,
        id: Uuid,
        broker_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Contract> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE contracts SET status = 'inactive'
            WHERE broker_id = $1
              AND status = 'active'
              AND COALESCE(category_id, $3) = COALESCE($2, $3)
              AND id != $4
            "#,
        )
        .bind(broker_id)
        .bind(category_id)
        .bind(NO_CATEGORY)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            UPDATE contracts SET status = 'active', confirmed_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LeadflowError::Conflict(format!(
                    "another contract was activated concurrently for broker {broker_id}"
                ))
            } else {
                LeadflowError::Database(e)
            }
        })?;

        tx.commit().await?;

        Ok(contract)
    }

    /// Active subscription contracts, for the monthly billing run.
    pub async fn active_subscription_contracts(&self) -> Result<Vec<Contract>> {
        let rows = sqlx::query_as::<_, Contract>(
            r#"
            SELECT * FROM contracts
            WHERE status = 'active' AND pricing_model = 'subscription'
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
