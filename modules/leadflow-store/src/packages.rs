use chrono::NaiveDate;
use uuid::Uuid;

use leadflow_common::types::{DistributionType, PackageStatus};
use leadflow_common::Result;

use crate::assignments::mark_lead_assigned;
use crate::models::{Lead, LeadAssignment, LeadPackage};
use crate::Store;

pub struct DeliverLeads {
    pub package_id: Uuid,
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub count: i32,
    pub unit_price_cents: i64,
    /// Pre-generated capability tokens, one per potential assignment.
    pub access_tokens: Vec<String>,
    /// Next delivery date for distributed packages that stay incomplete.
    pub next_delivery_date: Option<NaiveDate>,
}

pub struct PackageDelivery {
    pub package: LeadPackage,
    pub leads: Vec<Lead>,
    pub assignments: Vec<LeadAssignment>,
}

impl Store {
    pub async fn insert_package(
        &self,
        broker_id: Uuid,
        category_id: Option<Uuid>,
        name: &str,
        total_leads: i32,
        price_cents: i64,
        distribution_type: DistributionType,
        leads_per_day: i32,
    ) -> Result<LeadPackage> {
        let row = sqlx::query_as::<_, LeadPackage>(
            r#"
            INSERT INTO lead_packages
                (broker_id, category_id, name, total_leads, price_cents,
                 distribution_type, leads_per_day)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(broker_id)
        .bind(category_id)
        .bind(name)
        .bind(total_leads)
        .bind(price_cents)
        .bind(distribution_type)
        .bind(leads_per_day)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn package(&self, id: Uuid) -> Result<Option<LeadPackage>> {
        let row = sqlx::query_as::<_, LeadPackage>("SELECT * FROM lead_packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Activate a paid package and seed its delivery schedule.
    pub async fn activate_package(
        &self,
        id: Uuid,
        next_delivery_date: Option<NaiveDate>,
    ) -> Result<LeadPackage> {
        let row = sqlx::query_as::<_, LeadPackage>(
            r#"
            UPDATE lead_packages
            SET status = 'active', next_delivery_date = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next_delivery_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// A reserved-lead package delivers everything at once on payment.
    pub async fn complete_package(&self, id: Uuid) -> Result<LeadPackage> {
        let row = sqlx::query_as::<_, LeadPackage>(
            r#"
            UPDATE lead_packages
            SET status = 'completed', delivered_leads = total_leads,
                next_delivery_date = NULL, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_package_status(&self, id: Uuid, status: PackageStatus) -> Result<()> {
        sqlx::query("UPDATE lead_packages SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Hold explicitly selected leads for a package sold ahead of payment.
    pub async fn reserve_leads(&self, lead_ids: &[Uuid]) -> Result<()> {
        sqlx::query(
            "UPDATE leads SET status = 'reserved', updated_at = now() WHERE id = ANY($1)",
        )
        .bind(lead_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// One delivery batch: lock eligible leads, assign each to the package's
    /// broker, bump the delivered count, and complete the package when it
    /// fills — all in one transaction. `FOR UPDATE SKIP LOCKED` keeps two
    /// concurrent sweeps from delivering the same lead twice.
    pub async fn deliver_package_leads(&self, d: DeliverLeads) -> Result<PackageDelivery> {
        let mut tx = self.pool.begin().await?;

        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE status IN ('new', 'available')
              AND ($1::uuid IS NULL OR category_id = $1)
            ORDER BY created_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(d.category_id)
        .bind(d.count as i64)
        .fetch_all(&mut *tx)
        .await?;

        if leads.is_empty() {
            let package = sqlx::query_as::<_, LeadPackage>(
                "SELECT * FROM lead_packages WHERE id = $1",
            )
            .bind(d.package_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(PackageDelivery {
                package,
                leads: Vec::new(),
                assignments: Vec::new(),
            });
        }

        let mut assignments = Vec::with_capacity(leads.len());
        for (lead, token) in leads.iter().zip(&d.access_tokens) {
            let a = sqlx::query_as::<_, LeadAssignment>(
                r#"
                INSERT INTO lead_assignments
                    (lead_id, broker_id, package_id, pricing_model,
                     price_charged_cents, status, unlocked, access_token)
                VALUES ($1, $2, $3, 'package', $4, 'sent', TRUE, $5)
                RETURNING *
                "#,
            )
            .bind(lead.id)
            .bind(d.broker_id)
            .bind(d.package_id)
            .bind(d.unit_price_cents)
            .bind(token)
            .fetch_one(&mut *tx)
            .await?;
            mark_lead_assigned(&mut *tx, lead.id).await?;
            assignments.push(a);
        }

        let package = sqlx::query_as::<_, LeadPackage>(
            r#"
            UPDATE lead_packages
            SET delivered_leads = delivered_leads + $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(d.package_id)
        .bind(assignments.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let package = if package.delivered_leads >= package.total_leads {
            sqlx::query_as::<_, LeadPackage>(
                r#"
                UPDATE lead_packages
                SET status = 'completed', next_delivery_date = NULL, updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(d.package_id)
            .fetch_one(&mut *tx)
            .await?
        } else if let Some(next) = d.next_delivery_date {
            sqlx::query_as::<_, LeadPackage>(
                r#"
                UPDATE lead_packages
                SET next_delivery_date = $2, updated_at = now()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(d.package_id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?
        } else {
            package
        };

        tx.commit().await?;
        Ok(PackageDelivery {
            package,
            leads,
            assignments,
        })
    }

    /// Active distributed packages due for the daily sweep.
    pub async fn packages_due(&self, today: NaiveDate) -> Result<Vec<LeadPackage>> {
        let rows = sqlx::query_as::<_, LeadPackage>(
            r#"
            SELECT * FROM lead_packages
            WHERE status = 'active'
              AND distribution_type = 'distributed'
              AND next_delivery_date IS NOT NULL
              AND next_delivery_date <= $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
