//! Lead ingestion. Three entry paths — per-source webhook, the scheduled
//! ad-platform pull, and direct automation POSTs — converge on one
//! normalization routine: map submitted fields onto the contact columns,
//! match a category, keep the rest verbatim.

use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use leadflow_common::types::Ownership;
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::Lead;
use leadflow_store::NewLead;
use metaads_client::MetaAdsClient;

use crate::fieldmap::{match_category, FieldMatcher};
use crate::Ctx;

pub struct Submission {
    pub source_id: Option<Uuid>,
    /// Ad-platform lead id; deduplicated against previous imports.
    pub external_id: Option<String>,
    /// Submitted form/category name, matched against configured categories.
    pub category_hint: Option<String>,
    pub ownership: Ownership,
    pub fields: Map<String, Value>,
}

pub enum IngestOutcome {
    Created(Lead),
    /// A lead with this external id already exists.
    Duplicate { external_id: String },
}

#[derive(Debug, Default, serde::Serialize)]
pub struct SyncReport {
    pub pages: usize,
    pub forms: usize,
    pub imported: usize,
    pub duplicates: usize,
}

#[derive(Clone)]
pub struct IngestService {
    ctx: Ctx,
    matcher: std::sync::Arc<FieldMatcher>,
}

impl IngestService {
    pub fn new(ctx: Ctx) -> Self {
        Self {
            ctx,
            matcher: std::sync::Arc::new(FieldMatcher::default()),
        }
    }

    /// The single normalization routine behind every entry path.
    pub async fn ingest(&self, submission: Submission) -> Result<IngestOutcome> {
        let store = &self.ctx.store;

        let normalized = self.matcher.normalize(&submission.fields);
        let categories = store.categories().await?;
        let category_id = match_category(&categories, submission.category_hint.as_deref());

        let lead = store
            .insert_lead(NewLead {
                category_id,
                source_id: submission.source_id,
                external_id: submission.external_id.clone(),
                first_name: normalized.first_name,
                last_name: normalized.last_name,
                email: normalized.email,
                phone: normalized.phone,
                postal_code: normalized.postal_code,
                city: normalized.city,
                extra_data: Value::Object(normalized.extra_data),
                ownership: submission.ownership,
            })
            .await?;

        match lead {
            Some(lead) => {
                info!(lead_number = lead.lead_number, "Lead ingested");
                Ok(IngestOutcome::Created(lead))
            }
            None => {
                let external_id = submission.external_id.unwrap_or_default();
                info!(%external_id, "Duplicate lead skipped");
                Ok(IngestOutcome::Duplicate { external_id })
            }
        }
    }

    /// Webhook and automation path: the token identifies (and gates) the
    /// configured source.
    pub async fn ingest_from_source(
        &self,
        token: &str,
        body: Value,
    ) -> Result<IngestOutcome> {
        let source = self
            .ctx
            .store
            .source_by_token(token)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| {
                LeadflowError::Forbidden("unknown or inactive webhook token".to_string())
            })?;

        let fields = body
            .as_object()
            .cloned()
            .ok_or_else(|| LeadflowError::Validation("body must be a JSON object".to_string()))?;

        let category_hint = fields
            .get("category")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.ingest(Submission {
            source_id: Some(source.id),
            external_id: None,
            category_hint,
            ownership: Ownership::Sold,
            fields,
        })
        .await
    }

    /// Scheduled ad-platform pull: pages → lead forms → leads, cursor page
    /// by cursor page, deduplicating on the external lead id. Safe to
    /// re-run.
    pub async fn sync_ad_platform(&self, client: &MetaAdsClient) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        let pages = client
            .pages()
            .await
            .map_err(|e| LeadflowError::Other(anyhow::Error::new(e)))?;

        for page in &pages.data {
            report.pages += 1;
            let forms = match client.lead_forms(page).await {
                Ok(forms) => forms,
                Err(e) => {
                    warn!(page = %page.id, error = %e, "Failed to list lead forms; skipping page");
                    continue;
                }
            };

            for form in &forms.data {
                report.forms += 1;
                let mut after: Option<String> = None;

                loop {
                    let batch = match client
                        .leads(&form.id, page.access_token.as_deref(), after.as_deref())
                        .await
                    {
                        Ok(batch) => batch,
                        Err(e) => {
                            warn!(form = %form.id, error = %e, "Failed to fetch leads; skipping form");
                            break;
                        }
                    };

                    for entry in &batch.data {
                        // Cheap pre-check; the insert's ON CONFLICT arm is
                        // the real guard against concurrent imports.
                        if self
                            .ctx
                            .store
                            .lead_by_external_id(&entry.id)
                            .await?
                            .is_some()
                        {
                            report.duplicates += 1;
                            continue;
                        }

                        let mut fields = Map::new();
                        for field in &entry.field_data {
                            fields.insert(
                                field.name.clone(),
                                Value::String(field.values.join(", ")),
                            );
                        }

                        match self
                            .ingest(Submission {
                                source_id: None,
                                external_id: Some(entry.id.clone()),
                                category_hint: Some(form.name.clone()),
                                ownership: Ownership::Sold,
                                fields,
                            })
                            .await?
                        {
                            IngestOutcome::Created(_) => report.imported += 1,
                            IngestOutcome::Duplicate { .. } => report.duplicates += 1,
                        }
                    }

                    after = batch.next_cursor().map(str::to_string);
                    if after.is_none() {
                        break;
                    }
                }
            }
        }

        info!(
            imported = report.imported,
            duplicates = report.duplicates,
            "Ad-platform sync complete"
        );
        Ok(report)
    }
}
