//! Postgres persistence for the brokerage. One `Store` handle over a pool;
//! per-entity method groups live in their own modules. Every multi-step
//! mutation the workflow depends on (contract activation, gated assignment
//! creation, package delivery, commission invoicing) runs inside a single
//! transaction here.

pub mod models;

mod assignments;
mod contracts;
mod invoices;
mod leads;
mod outbox;
mod packages;
mod partners;

pub use assignments::{FollowupUpdate, NewAssignment};
pub use contracts::NewContract;
pub use invoices::{CommissionInvoice, NewInvoice, NewInvoiceItem};
pub use leads::NewLead;
pub use outbox::NewEmail;
pub use packages::{DeliverLeads, PackageDelivery};
pub use partners::{NewBroker, NewCategory, NewSource};

use leadflow_common::Result;
use sqlx::PgPool;

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| leadflow_common::LeadflowError::Database(e.into()))?;
        Ok(())
    }
}

/// Postgres unique-constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
