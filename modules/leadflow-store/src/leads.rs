use uuid::Uuid;

use leadflow_common::types::{LeadStatus, Ownership};
use leadflow_common::Result;

use crate::models::Lead;
use crate::Store;

pub struct NewLead {
    pub category_id: Option<Uuid>,
    pub source_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub extra_data: serde_json::Value,
    pub ownership: Ownership,
}

impl Store {
    /// Insert a lead. Returns `None` when a lead with the same external id
    /// already exists — the ON CONFLICT arm makes concurrent ad-platform
    /// imports safe.
    pub async fn insert_lead(&self, l: NewLead) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads
                (category_id, source_id, external_id, first_name, last_name,
                 email, phone, postal_code, city, extra_data, ownership)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (external_id) WHERE external_id IS NOT NULL DO NOTHING
            RETURNING *
            "#,
        )
        .bind(l.category_id)
        .bind(l.source_id)
        .bind(&l.external_id)
        .bind(&l.first_name)
        .bind(&l.last_name)
        .bind(&l.email)
        .bind(&l.phone)
        .bind(&l.postal_code)
        .bind(&l.city)
        .bind(&l.extra_data)
        .bind(l.ownership)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn lead(&self, id: Uuid) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn lead_by_external_id(&self, external_id: &str) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn leads(&self, limit: i64) -> Result<Vec<Lead>> {
        let rows =
            sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<()> {
        sqlx::query("UPDATE leads SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
