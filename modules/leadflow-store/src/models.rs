use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use leadflow_common::types::{
    AssignmentStatus, ContractStatus, DistributionType, FollowupResponse, InvoiceStatus,
    InvoiceType, LeadStatus, Ownership, PackageStatus, PricingModel,
};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Broker {
    pub id: Uuid,
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadSource {
    pub id: Uuid,
    pub name: String,
    /// Keys `POST /webhook/{token}`. Shown to the operator who configures
    /// the source, so it is serialized.
    pub webhook_token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub lead_number: i64,
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
    pub status: LeadStatus,
    pub assignment_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// "First Last" with whatever halves are present.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => format!("Lead #{}", self.lead_number),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_per_lead_cents: Option<i64>,
    pub monthly_fee_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub followup_days: i32,
    pub status: ContractStatus,
    #[serde(skip_serializing)]
    pub confirmation_token: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadAssignment {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub broker_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub pricing_model: PricingModel,
    pub price_charged_cents: Option<i64>,
    pub revenue_share_percent: Option<f64>,
    pub status: AssignmentStatus,
    pub unlocked: bool,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub followup_response: Option<FollowupResponse>,
    pub followup_date: Option<NaiveDate>,
    pub followup_sent_at: Option<DateTime<Utc>>,
    pub followup_responded_at: Option<DateTime<Utc>>,
    pub followup_count: i32,
    pub followup_notes: Option<String>,
    pub commission_amount_cents: Option<i64>,
    pub commission_invoice_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub broker_id: Uuid,
    pub invoice_type: InvoiceType,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub due_date: NaiveDate,
    pub description: Option<String>,
    pub stripe_payment_link: Option<String>,
    pub stripe_payment_link_id: Option<String>,
    pub stripe_payment_id: Option<String>,
    pub assignment_id: Option<Uuid>,
    pub package_id: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub assignment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeadPackage {
    pub id: Uuid,
    pub broker_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub total_leads: i32,
    pub delivered_leads: i32,
    pub price_cents: i64,
    pub distribution_type: DistributionType,
    pub leads_per_day: i32,
    pub status: PackageStatus,
    pub next_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadPackage {
    pub fn remaining(&self) -> i32 {
        self.total_leads - self.delivered_leads
    }

    /// Per-lead price in cents (integer division; the remainder stays on
    /// the invoice total).
    pub fn unit_price_cents(&self) -> i64 {
        if self.total_leads > 0 {
            self.price_cents / self.total_leads as i64
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutboxEmail {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub kind: String,
    pub assignment_id: Option<Uuid>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
