pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{LeadflowError, Result};
pub use types::{
    AssignmentStatus, ContractStatus, DistributionType, FollowupResponse, InvoiceStatus,
    InvoiceType, LeadStatus, Ownership, PackageStatus, PricingModel,
};
