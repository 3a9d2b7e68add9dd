use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use leadflow_common::types::InvoiceType;
use leadflow_common::Result;

use crate::models::{Invoice, InvoiceItem};
use crate::Store;

pub struct NewInvoice {
    pub invoice_number: String,
    pub broker_id: Uuid,
    pub invoice_type: InvoiceType,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub assignment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub items: Vec<NewInvoiceItem>,
}

pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub assignment_id: Option<Uuid>,
}

/// A commission invoice and the assignments it settles, stamped together.
pub struct CommissionInvoice {
    pub invoice: NewInvoice,
    pub assignment_ids: Vec<Uuid>,
}

async fn insert_invoice_tx(
    conn: &mut sqlx::PgConnection,
    inv: &NewInvoice,
) -> sqlx::Result<Invoice> {
    let row = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices
            (invoice_number, broker_id, invoice_type, amount_cents, due_date,
             description, assignment_id, package_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&inv.invoice_number)
    .bind(inv.broker_id)
    .bind(inv.invoice_type)
    .bind(inv.amount_cents)
    .bind(inv.due_date)
    .bind(&inv.description)
    .bind(inv.assignment_id)
    .bind(inv.package_id)
    .fetch_one(&mut *conn)
    .await?;

    for item in &inv.items {
        sqlx::query(
            r#"
            INSERT INTO invoice_items
                (invoice_id, description, quantity, unit_price_cents, assignment_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.assignment_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(row)
}

impl Store {
    /// Allocate the next per-year invoice sequence number. A single upsert,
    /// so concurrent allocations never hand out the same number.
    pub async fn next_invoice_seq(&self, year: i32) -> Result<i32> {
        let (seq,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO invoice_counters (year, last_seq)
            VALUES ($1, 1)
            ON CONFLICT (year)
            DO UPDATE SET last_seq = invoice_counters.last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(seq)
    }

    /// Insert an invoice with its line items in one transaction.
    pub async fn insert_invoice(&self, inv: NewInvoice) -> Result<Invoice> {
        let mut tx = self.pool.begin().await?;
        let row = insert_invoice_tx(&mut *tx, &inv).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn invoice_by_number(&self, number: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = $1")
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn invoice_by_payment_link(&self, link_id: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE stripe_payment_link_id = $1",
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn invoice_items(&self, invoice_id: Uuid) -> Result<Vec<InvoiceItem>> {
        let rows = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = $1 ORDER BY created_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_invoice_payment_link(
        &self,
        id: Uuid,
        link: &str,
        link_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET stripe_payment_link = $2, stripe_payment_link_id = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(link)
        .bind(link_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cancel an invoice that never got a payment link. Only pending
    /// invoices qualify.
    pub async fn cancel_invoice(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE invoices SET status = 'cancelled' WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Guarded paid transition. Returns `None` when the invoice was already
    /// paid (or cancelled) — the idempotency hinge for both confirmation
    /// paths.
    pub async fn mark_invoice_paid(
        &self,
        id: Uuid,
        payment_id: Option<&str>,
    ) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = 'paid', paid_at = now(),
                stripe_payment_id = COALESCE($2, stripe_payment_id)
            WHERE id = $1 AND status IN ('pending', 'sent')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a commission invoice and stamp the settled assignments with its
    /// id, atomically — a crashed run never double-bills a commission.
    pub async fn create_commission_invoice(&self, ci: CommissionInvoice) -> Result<Invoice> {
        let mut tx = self.pool.begin().await?;

        let invoice = insert_invoice_tx(&mut *tx, &ci.invoice).await?;

        sqlx::query(
            "UPDATE lead_assignments SET commission_invoice_id = $1, updated_at = now() WHERE id = ANY($2)",
        )
        .bind(invoice.id)
        .bind(&ci.assignment_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(invoice)
    }

    /// Whether the broker already has a subscription invoice in the given
    /// period (the monthly run's duplicate guard).
    pub async fn subscription_invoice_exists(
        &self,
        broker_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM invoices
                WHERE broker_id = $1
                  AND invoice_type = 'subscription'
                  AND created_at >= $2 AND created_at < $3
            )
            "#,
        )
        .bind(broker_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}
