//! Brokers, categories and lead sources — the reference data the workflow
//! hangs off.

use uuid::Uuid;

use leadflow_common::Result;

use crate::models::{Broker, Category, LeadSource};
use crate::Store;

pub struct NewBroker {
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

pub struct NewCategory {
    pub name: String,
    pub position: i32,
}

pub struct NewSource {
    pub name: String,
    pub webhook_token: String,
}

impl Store {
    pub async fn insert_broker(&self, b: NewBroker) -> Result<Broker> {
        let row = sqlx::query_as::<_, Broker>(
            r#"
            INSERT INTO brokers (name, company, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&b.name)
        .bind(&b.company)
        .bind(&b.email)
        .bind(&b.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn broker(&self, id: Uuid) -> Result<Option<Broker>> {
        let row = sqlx::query_as::<_, Broker>("SELECT * FROM brokers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn brokers(&self) -> Result<Vec<Broker>> {
        let rows = sqlx::query_as::<_, Broker>("SELECT * FROM brokers ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert_category(&self, c: NewCategory) -> Result<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, position)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&c.name)
        .bind(c.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn category(&self, id: Uuid) -> Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// All categories in configured order. The first one is the ingestion
    /// default when no submitted category matches.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY position ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_source(&self, s: NewSource) -> Result<LeadSource> {
        let row = sqlx::query_as::<_, LeadSource>(
            r#"
            INSERT INTO lead_sources (name, webhook_token)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&s.name)
        .bind(&s.webhook_token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn sources(&self) -> Result<Vec<LeadSource>> {
        let rows =
            sqlx::query_as::<_, LeadSource>("SELECT * FROM lead_sources ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    pub async fn source_by_token(&self, token: &str) -> Result<Option<LeadSource>> {
        let row =
            sqlx::query_as::<_, LeadSource>("SELECT * FROM lead_sources WHERE webhook_token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }
}
