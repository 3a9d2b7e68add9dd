use serde::{Deserialize, Serialize};

// --- Leads ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum Ownership {
    Sold,
    Managed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Available,
    Reserved,
    Assigned,
    Closed,
}

impl LeadStatus {
    /// Leads in these states may be handed to a broker or reserved for a
    /// package purchase.
    pub fn is_assignable(&self) -> bool {
        matches!(self, LeadStatus::New | LeadStatus::Available)
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Available => write!(f, "available"),
            LeadStatus::Reserved => write!(f, "reserved"),
            LeadStatus::Assigned => write!(f, "assigned"),
            LeadStatus::Closed => write!(f, "closed"),
        }
    }
}

// --- Contracts & pricing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PricingModel {
    /// Per-lead price, payment gates delivery.
    Fixed,
    /// Monthly fee, leads deliver immediately.
    Subscription,
    /// Free delivery, commission owed on successful closure.
    RevenueShare,
    /// Ad-hoc purchase without a contract, payment gates delivery.
    Single,
    /// Lead delivered as part of a paid package.
    Package,
}

impl PricingModel {
    /// Whether payment must precede delivery for a fresh assignment.
    pub fn payment_gated(&self) -> bool {
        matches!(self, PricingModel::Fixed | PricingModel::Single)
    }

    /// Models a standing contract may carry.
    pub fn valid_for_contract(&self) -> bool {
        matches!(
            self,
            PricingModel::Fixed | PricingModel::Subscription | PricingModel::RevenueShare
        )
    }
}

impl std::fmt::Display for PricingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingModel::Fixed => write!(f, "fixed"),
            PricingModel::Subscription => write!(f, "subscription"),
            PricingModel::RevenueShare => write!(f, "revenue_share"),
            PricingModel::Single => write!(f, "single"),
            PricingModel::Package => write!(f, "package"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Active,
    Inactive,
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractStatus::Pending => write!(f, "pending"),
            ContractStatus::Active => write!(f, "active"),
            ContractStatus::Inactive => write!(f, "inactive"),
        }
    }
}

// --- Assignments ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Sent,
    InProgress,
    Scheduled,
    Returned,
    Success,
}

impl AssignmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Returned | AssignmentStatus::Success)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "pending"),
            AssignmentStatus::Sent => write!(f, "sent"),
            AssignmentStatus::InProgress => write!(f, "in_progress"),
            AssignmentStatus::Scheduled => write!(f, "scheduled"),
            AssignmentStatus::Returned => write!(f, "returned"),
            AssignmentStatus::Success => write!(f, "success"),
        }
    }
}

/// A broker's answer to a follow-up request on a revenue-share lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum FollowupResponse {
    Reached,
    Scheduled,
    NotReached,
    Closed,
}

impl FollowupResponse {
    /// Terminal responses reject any further submission.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FollowupResponse::NotReached | FollowupResponse::Closed)
    }
}

impl std::fmt::Display for FollowupResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FollowupResponse::Reached => write!(f, "reached"),
            FollowupResponse::Scheduled => write!(f, "scheduled"),
            FollowupResponse::NotReached => write!(f, "not_reached"),
            FollowupResponse::Closed => write!(f, "closed"),
        }
    }
}

// --- Invoices ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum InvoiceType {
    Single,
    Fixed,
    Subscription,
    Commission,
    Package,
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceType::Single => write!(f, "single"),
            InvoiceType::Fixed => write!(f, "fixed"),
            InvoiceType::Subscription => write!(f, "subscription"),
            InvoiceType::Commission => write!(f, "commission"),
            InvoiceType::Package => write!(f, "package"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Sent,
    Paid,
    Cancelled,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Sent => write!(f, "sent"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// --- Packages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    Paid,
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageStatus::Pending => write!(f, "pending"),
            PackageStatus::Paid => write!(f, "paid"),
            PackageStatus::Active => write!(f, "active"),
            PackageStatus::Completed => write!(f, "completed"),
            PackageStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum DistributionType {
    Instant,
    Distributed,
}

impl std::fmt::Display for DistributionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionType::Instant => write!(f, "instant"),
            DistributionType::Distributed => write!(f, "distributed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The status columns are TEXT and several queries compare against the
    // literal strings, so the wire forms are load-bearing.
    #[test]
    fn status_strings_match_the_stored_literals() {
        assert_eq!(serde_json::to_string(&LeadStatus::New).unwrap(), "\"new\"");
        assert_eq!(
            serde_json::to_string(&PricingModel::RevenueShare).unwrap(),
            "\"revenue_share\""
        );
        assert_eq!(
            serde_json::to_string(&AssignmentStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&FollowupResponse::NotReached).unwrap(),
            "\"not_reached\""
        );
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn display_agrees_with_serde() {
        assert_eq!(PricingModel::RevenueShare.to_string(), "revenue_share");
        assert_eq!(AssignmentStatus::InProgress.to_string(), "in_progress");
        assert_eq!(FollowupResponse::NotReached.to_string(), "not_reached");
    }

    #[test]
    fn only_fixed_and_single_gate_on_payment() {
        assert!(PricingModel::Fixed.payment_gated());
        assert!(PricingModel::Single.payment_gated());
        assert!(!PricingModel::Subscription.payment_gated());
        assert!(!PricingModel::RevenueShare.payment_gated());
        assert!(!PricingModel::Package.payment_gated());
    }

    #[test]
    fn contract_models_exclude_single_and_package() {
        assert!(PricingModel::Fixed.valid_for_contract());
        assert!(PricingModel::Subscription.valid_for_contract());
        assert!(PricingModel::RevenueShare.valid_for_contract());
        assert!(!PricingModel::Single.valid_for_contract());
        assert!(!PricingModel::Package.valid_for_contract());
    }
}
