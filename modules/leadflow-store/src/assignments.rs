use chrono::NaiveDate;
use uuid::Uuid;

use leadflow_common::types::{AssignmentStatus, FollowupResponse, LeadStatus, PricingModel};
use leadflow_common::Result;

use crate::models::{LeadAssignment, OutboxEmail};
use crate::outbox::{insert_email, NewEmail};
use crate::Store;

pub struct NewAssignment {
    pub lead_id: Uuid,
    pub broker_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_charged_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub status: AssignmentStatus,
    pub unlocked: bool,
    pub access_token: String,
    pub followup_date: Option<NaiveDate>,
}

/// The full effect of a follow-up submission, applied in one transaction.
pub struct FollowupUpdate {
    pub assignment_id: Uuid,
    pub lead_id: Uuid,
    pub assignment_status: AssignmentStatus,
    pub response: FollowupResponse,
    pub lead_status: LeadStatus,
    pub next_followup_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub commission_amount_cents: Option<i64>,
}

async fn insert_assignment(
    conn: &mut sqlx::PgConnection,
    a: &NewAssignment,
) -> sqlx::Result<LeadAssignment> {
    sqlx::query_as::<_, LeadAssignment>(
        r#"
        INSERT INTO lead_assignments
            (lead_id, broker_id, contract_id, package_id, pricing_model,
             price_charged_cents, revenue_share_percent, status, unlocked,
             access_token, followup_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(a.lead_id)
    .bind(a.broker_id)
    .bind(a.contract_id)
    .bind(a.package_id)
    .bind(a.pricing_model)
    .bind(a.price_charged_cents)
    .bind(a.revenue_share_percent)
    .bind(a.status)
    .bind(a.unlocked)
    .bind(&a.access_token)
    .bind(a.followup_date)
    .fetch_one(conn)
    .await
}

pub(crate) async fn mark_lead_assigned(
    conn: &mut sqlx::PgConnection,
    lead_id: Uuid,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE leads
        SET status = 'assigned', assignment_count = assignment_count + 1,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(lead_id)
    .execute(conn)
    .await?;
    Ok(())
}

impl Store {
    pub async fn assignment(&self, id: Uuid) -> Result<Option<LeadAssignment>> {
        let row = sqlx::query_as::<_, LeadAssignment>(
            "SELECT * FROM lead_assignments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Immediate delivery: insert `sent` assignments, mark their leads
    /// assigned, and enqueue the (single, possibly consolidated) delivery
    /// notification — one transaction.
    pub async fn create_sent_assignments(
        &self,
        assignments: Vec<NewAssignment>,
        email: NewEmail,
    ) -> Result<(Vec<LeadAssignment>, OutboxEmail)> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(assignments.len());
        for a in &assignments {
            let row = insert_assignment(&mut *tx, a).await?;
            mark_lead_assigned(&mut *tx, a.lead_id).await?;
            created.push(row);
        }
        let outbox = insert_email(&mut *tx, &email).await?;

        tx.commit().await?;
        Ok((created, outbox))
    }

    /// Payment-gated delivery: insert a locked `pending` assignment, attach
    /// it (and the payment link) to its invoice, reserve the lead, and
    /// enqueue the payment-request notification — one transaction.
    pub async fn create_pending_assignment(
        &self,
        assignment: NewAssignment,
        invoice_id: Uuid,
        payment_link: &str,
        payment_link_id: &str,
        email: NewEmail,
    ) -> Result<(LeadAssignment, OutboxEmail)> {
        let mut tx = self.pool.begin().await?;

        let row = insert_assignment(&mut *tx, &assignment).await?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET assignment_id = $2, stripe_payment_link = $3,
                stripe_payment_link_id = $4
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .bind(row.id)
        .bind(payment_link)
        .bind(payment_link_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE leads SET status = 'reserved', updated_at = now() WHERE id = $1")
            .bind(assignment.lead_id)
            .execute(&mut *tx)
            .await?;

        let outbox = insert_email(&mut *tx, &email).await?;

        tx.commit().await?;
        Ok((row, outbox))
    }

    /// Unlock a pending assignment after payment. Returns `None` when the
    /// assignment was not pending (already delivered) — the caller treats
    /// that as a no-op, not an error.
    pub async fn deliver_assignment(
        &self,
        id: Uuid,
        email: NewEmail,
    ) -> Result<Option<(LeadAssignment, OutboxEmail)>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, LeadAssignment>(
            r#"
            UPDATE lead_assignments
            SET status = 'sent', unlocked = TRUE, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(assignment) = updated else {
            return Ok(None);
        };

        mark_lead_assigned(&mut *tx, assignment.lead_id).await?;
        let outbox = insert_email(&mut *tx, &email).await?;

        tx.commit().await?;
        Ok(Some((assignment, outbox)))
    }

    /// Apply a follow-up submission: assignment status + response fields and
    /// the lead's status move together.
    pub async fn apply_followup(&self, u: FollowupUpdate) -> Result<LeadAssignment> {
        let mut tx = self.pool.begin().await?;

        let assignment = sqlx::query_as::<_, LeadAssignment>(
            r#"
            UPDATE lead_assignments
            SET status = $2,
                followup_response = $3,
                followup_date = $4,
                followup_responded_at = now(),
                followup_sent_at = NULL,
                followup_count = followup_count + 1,
                followup_notes = COALESCE($5, followup_notes),
                commission_amount_cents = COALESCE($6, commission_amount_cents),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(u.assignment_id)
        .bind(u.assignment_status)
        .bind(u.response)
        .bind(u.next_followup_date)
        .bind(&u.notes)
        .bind(u.commission_amount_cents)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE leads SET status = $2, updated_at = now() WHERE id = $1")
            .bind(u.lead_id)
            .bind(u.lead_status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(assignment)
    }

    /// Revenue-share assignments whose follow-up is due and unsent. Terminal
    /// responses are excluded; `reached`/`scheduled` stay eligible for the
    /// next cycle.
    pub async fn followups_due(&self, today: NaiveDate) -> Result<Vec<LeadAssignment>> {
        let rows = sqlx::query_as::<_, LeadAssignment>(
            r#"
            SELECT * FROM lead_assignments
            WHERE pricing_model = 'revenue_share'
              AND status NOT IN ('returned', 'success')
              AND followup_date IS NOT NULL AND followup_date <= $1
              AND followup_sent_at IS NULL
              AND (followup_response IS NULL
                   OR followup_response IN ('reached', 'scheduled'))
            ORDER BY followup_date ASC
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Stamp `followup_sent_at` and enqueue the request email. The guarded
    /// UPDATE is the idempotency sentinel: a second sweep run returns `None`
    /// and sends nothing.
    pub async fn mark_followup_sent(
        &self,
        id: Uuid,
        email: NewEmail,
    ) -> Result<Option<OutboxEmail>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE lead_assignments
            SET followup_sent_at = now(), updated_at = now()
            WHERE id = $1 AND followup_sent_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let outbox = insert_email(&mut *tx, &email).await?;
        tx.commit().await?;
        Ok(Some(outbox))
    }

    /// Successful revenue-share assignments with a commission that has not
    /// yet landed on a commission invoice.
    pub async fn commissionable_assignments(&self) -> Result<Vec<LeadAssignment>> {
        let rows = sqlx::query_as::<_, LeadAssignment>(
            r#"
            SELECT * FROM lead_assignments
            WHERE pricing_model = 'revenue_share'
              AND status = 'success'
              AND commission_amount_cents IS NOT NULL
              AND commission_invoice_id IS NULL
            ORDER BY broker_id, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
