pub mod error;
pub mod types;

pub use error::{MetaAdsError, Result};
pub use types::{Cursors, LeadEntry, LeadField, LeadForm, ListResponse, Page, Paging};

const BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Thin client for the ad platform's Graph API: the importer walks
/// pages → lead forms → leads, one cursor page at a time.
pub struct MetaAdsClient {
    client: reqwest::Client,
    token: String,
}

impl MetaAdsClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        after: Option<&str>,
    ) -> Result<ListResponse<T>> {
        let mut req = self
            .client
            .get(format!("{BASE_URL}/{path}"))
            .query(&[("access_token", token)]);
        if let Some(cursor) = after {
            req = req.query(&[("after", cursor)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MetaAdsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let list: ListResponse<T> = resp.json().await?;
        Ok(list)
    }

    /// Pages the authorized account manages, with their page tokens.
    pub async fn pages(&self) -> Result<ListResponse<Page>> {
        self.get_list("me/accounts?fields=id,name,access_token", &self.token, None)
            .await
    }

    /// Lead-generation forms on a page. Uses the page token when the page
    /// carries one.
    pub async fn lead_forms(&self, page: &Page) -> Result<ListResponse<LeadForm>> {
        let token = page.access_token.as_deref().unwrap_or(&self.token);
        self.get_list(
            &format!("{}/leadgen_forms?fields=id,name,status", page.id),
            token,
            None,
        )
        .await
    }

    /// One cursor page of a form's leads.
    pub async fn leads(
        &self,
        form_id: &str,
        page_token: Option<&str>,
        after: Option<&str>,
    ) -> Result<ListResponse<LeadEntry>> {
        let token = page_token.unwrap_or(&self.token);
        self.get_list(
            &format!("{form_id}/leads?fields=id,created_time,field_data"),
            token,
            after,
        )
        .await
    }
}
