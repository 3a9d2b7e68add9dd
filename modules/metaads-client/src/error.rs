pub type Result<T> = std::result::Result<T, MetaAdsError>;

#[derive(Debug, thiserror::Error)]
pub enum MetaAdsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API error ({status}): {message}")]
    Api { status: u16, message: String },
}
