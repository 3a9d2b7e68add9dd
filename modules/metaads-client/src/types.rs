use serde::Deserialize;

/// Generic Graph API list envelope with cursor pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl<T> ListResponse<T> {
    /// Cursor for the next page, if the API reported one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .filter(|p| p.next.is_some())
            .and_then(|p| p.cursors.as_ref())
            .and_then(|c| c.after.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Option<Cursors>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

/// A page the authorized account manages.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    pub name: String,
    /// Page-scoped token; lead endpoints require it when present.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// A lead-generation form attached to a page.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadForm {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// One submitted lead. `field_data` carries the raw form answers.
/// `created_time` stays a raw string — the Graph API's `+0000` offset format
/// is not RFC 3339 and the importer never needs it parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadEntry {
    pub id: String,
    pub created_time: String,
    #[serde(default)]
    pub field_data: Vec<LeadField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadField {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lead_page() {
        let body = r#"{
            "data": [{
                "id": "987",
                "created_time": "2025-11-02T09:15:00+0000",
                "field_data": [
                    {"name": "vorname", "values": ["Anna"]},
                    {"name": "email", "values": ["anna@example.com"]}
                ]
            }],
            "paging": {"cursors": {"before": "b", "after": "a"}, "next": "https://..."}
        }"#;
        let page: ListResponse<LeadEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].field_data[0].values[0], "Anna");
        assert_eq!(page.next_cursor(), Some("a"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let body = r#"{"data": [], "paging": {"cursors": {"before": "b", "after": "a"}}}"#;
        let page: ListResponse<LeadEntry> = serde_json::from_str(body).unwrap();
        // `after` is present but there is no `next` link — iteration stops.
        assert_eq!(page.next_cursor(), None);
    }
}
