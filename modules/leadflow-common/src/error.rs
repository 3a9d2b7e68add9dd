use thiserror::Error;

/// Result type alias for leadflow operations.
pub type Result<T> = std::result::Result<T, LeadflowError>;

#[derive(Debug, Error)]
pub enum LeadflowError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid {entity} status transition: {from} -> {to}")]
    Transition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
