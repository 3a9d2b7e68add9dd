use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    /// Base URL used when building customer-facing links (contract
    /// confirmation, follow-up feedback) embedded in emails.
    pub public_base_url: String,

    // Payment provider
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub currency: String,

    // Transactional email. No token selects the no-op mailer.
    pub postmark_token: Option<String>,
    pub mail_from: String,

    // Ad-platform import. No token disables the sync sweep.
    pub meta_access_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            stripe_secret_key: required_env("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: required_env("STRIPE_WEBHOOK_SECRET"),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "eur".to_string()),
            postmark_token: env::var("POSTMARK_TOKEN").ok().filter(|t| !t.is_empty()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "noreply@localhost".to_string()),
            meta_access_token: env::var("META_ACCESS_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
