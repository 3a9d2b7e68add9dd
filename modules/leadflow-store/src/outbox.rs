//! Durable notification outbox. Rows are enqueued next to the mutation that
//! needs them and drained by the dispatch sweep; a failed send is retried,
//! never rolled back into the primary record.

use uuid::Uuid;

use leadflow_common::Result;

use crate::models::OutboxEmail;
use crate::Store;

#[derive(Debug, Clone)]
pub struct NewEmail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub kind: String,
    pub assignment_id: Option<Uuid>,
}

pub(crate) async fn insert_email(
    conn: &mut sqlx::PgConnection,
    e: &NewEmail,
) -> sqlx::Result<OutboxEmail> {
    sqlx::query_as::<_, OutboxEmail>(
        r#"
        INSERT INTO email_outbox (recipient, subject, body, kind, assignment_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&e.recipient)
    .bind(&e.subject)
    .bind(&e.body)
    .bind(&e.kind)
    .bind(e.assignment_id)
    .fetch_one(conn)
    .await
}

impl Store {
    /// Enqueue outside a workflow transaction (package delivery builds its
    /// recipient list inside the delivery transaction, so its email lands
    /// just after commit).
    pub async fn enqueue_email(&self, e: NewEmail) -> Result<OutboxEmail> {
        let mut conn = self.pool.acquire().await?;
        let row = insert_email(&mut conn, &e).await?;
        Ok(row)
    }

    pub async fn pending_emails(&self, max_attempts: i32, limit: i64) -> Result<Vec<OutboxEmail>> {
        let rows = sqlx::query_as::<_, OutboxEmail>(
            r#"
            SELECT * FROM email_outbox
            WHERE sent_at IS NULL AND attempts < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn outbox_email(&self, id: Uuid) -> Result<Option<OutboxEmail>> {
        let row = sqlx::query_as::<_, OutboxEmail>("SELECT * FROM email_outbox WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn mark_email_sent(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE email_outbox SET sent_at = now() WHERE id = $1 AND sent_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_email_failed(&self, id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE email_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
