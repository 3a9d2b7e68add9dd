//! The revenue-share follow-up loop. The broker gets a token link per
//! assignment, answers with one of four statuses, and the assignment / lead
//! pair moves through an explicit transition table. Non-terminal answers
//! schedule the next follow-up three business days out; `closed` computes
//! the commission.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use leadflow_common::types::{AssignmentStatus, FollowupResponse, LeadStatus, PricingModel};
use leadflow_common::{LeadflowError, Result};
use leadflow_store::models::{Lead, LeadAssignment};
use leadflow_store::FollowupUpdate;

use crate::calendar::add_business_days;
use crate::notify::messages;
use crate::states::{ensure_assignment, ensure_lead};
use crate::tokens::constant_time_eq;
use crate::{outbox, Ctx};

/// Business days until the next follow-up after a non-terminal answer.
pub const RESCHEDULE_BUSINESS_DAYS: u32 = 3;

/// A second click within this window (seconds) — before the next reminder
/// went out — is rejected.
pub const RESUBMIT_COOLDOWN_SECS: i64 = 3600;

/// What one submitted status does to the assignment and its lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowupEffect {
    pub assignment_status: AssignmentStatus,
    pub lead_status: LeadStatus,
    pub schedules_next: bool,
}

/// The transition table.
pub fn followup_effect(response: FollowupResponse) -> FollowupEffect {
    match response {
        FollowupResponse::NotReached => FollowupEffect {
            assignment_status: AssignmentStatus::Returned,
            lead_status: LeadStatus::Available,
            schedules_next: false,
        },
        FollowupResponse::Reached => FollowupEffect {
            assignment_status: AssignmentStatus::InProgress,
            lead_status: LeadStatus::Assigned,
            schedules_next: true,
        },
        FollowupResponse::Scheduled => FollowupEffect {
            assignment_status: AssignmentStatus::Scheduled,
            lead_status: LeadStatus::Assigned,
            schedules_next: true,
        },
        FollowupResponse::Closed => FollowupEffect {
            assignment_status: AssignmentStatus::Success,
            lead_status: LeadStatus::Closed,
            schedules_next: false,
        },
    }
}

/// `commission = amount × percent / 100`, rounded to the nearest cent.
pub fn commission_cents(amount_cents: i64, percent: f64) -> i64 {
    (amount_cents as f64 * percent / 100.0).round() as i64
}

/// A non-terminal answer whose next reminder has not gone out yet rejects
/// re-submission for an hour — a broker resubmitting seconds after their
/// first click changes nothing.
pub fn in_cooldown(
    response: Option<FollowupResponse>,
    followup_sent_at: Option<DateTime<Utc>>,
    responded_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match (response, followup_sent_at, responded_at) {
        (Some(r), None, Some(at)) if !r.is_terminal() => {
            now - at < Duration::seconds(RESUBMIT_COOLDOWN_SECS)
        }
        _ => false,
    }
}

/// Reject access for finalized or cooling-down assignments. Shared by the
/// read and submit endpoints.
pub fn check_open(assignment: &LeadAssignment, now: DateTime<Utc>) -> Result<()> {
    if assignment.pricing_model != PricingModel::RevenueShare {
        return Err(LeadflowError::Validation(
            "follow-up applies to revenue share assignments only".to_string(),
        ));
    }
    if let Some(response) = assignment.followup_response {
        if response.is_terminal() {
            return Err(LeadflowError::Validation(
                "follow-up is already finalized".to_string(),
            ));
        }
    }
    if in_cooldown(
        assignment.followup_response,
        assignment.followup_sent_at,
        assignment.followup_responded_at,
        now,
    ) {
        return Err(LeadflowError::Validation(
            "a response was just recorded; please wait before updating it".to_string(),
        ));
    }
    Ok(())
}

pub struct SubmitFollowup {
    pub status: FollowupResponse,
    pub notes: Option<String>,
    /// Closing amount in cents; the stored share percent turns it into the
    /// commission.
    pub commission_amount_cents: Option<i64>,
}

/// The sanitized view behind the feedback link.
#[derive(Debug, Serialize)]
pub struct FollowupView {
    pub assignment_id: Uuid,
    pub status: AssignmentStatus,
    pub followup_response: Option<FollowupResponse>,
    pub followup_date: Option<chrono::NaiveDate>,
    pub followup_count: i32,
    pub revenue_share_percent: Option<f64>,
    pub lead_name: String,
    pub lead_email: Option<String>,
    pub lead_phone: Option<String>,
    pub lead_city: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct FollowupSweepReport {
    pub due: usize,
    pub requested: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct FollowupService {
    ctx: Ctx,
}

impl FollowupService {
    pub fn new(ctx: Ctx) -> Self {
        Self { ctx }
    }

    async fn authorized(&self, assignment_id: Uuid, token: &str) -> Result<LeadAssignment> {
        let assignment = self
            .ctx
            .store
            .assignment(assignment_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("assignment {assignment_id}")))?;
        if !constant_time_eq(assignment.access_token.as_bytes(), token.as_bytes()) {
            return Err(LeadflowError::Forbidden("access token mismatch".to_string()));
        }
        Ok(assignment)
    }

    pub async fn view(&self, assignment_id: Uuid, token: &str) -> Result<FollowupView> {
        let assignment = self.authorized(assignment_id, token).await?;
        check_open(&assignment, Utc::now())?;

        let lead = self.load_lead(&assignment).await?;
        Ok(FollowupView {
            assignment_id: assignment.id,
            status: assignment.status,
            followup_response: assignment.followup_response,
            followup_date: assignment.followup_date,
            followup_count: assignment.followup_count,
            revenue_share_percent: assignment.revenue_share_percent,
            lead_name: lead.display_name(),
            lead_email: lead.email,
            lead_phone: lead.phone,
            lead_city: lead.city,
        })
    }

    pub async fn submit(
        &self,
        assignment_id: Uuid,
        token: &str,
        req: SubmitFollowup,
    ) -> Result<LeadAssignment> {
        let assignment = self.authorized(assignment_id, token).await?;
        check_open(&assignment, Utc::now())?;

        let effect = followup_effect(req.status);
        ensure_assignment(assignment.status, effect.assignment_status)?;

        let lead = self.load_lead(&assignment).await?;
        ensure_lead(lead.status, effect.lead_status)?;

        let commission_amount_cents = if req.status == FollowupResponse::Closed {
            match (req.commission_amount_cents, assignment.revenue_share_percent) {
                (Some(amount), Some(percent)) => Some(commission_cents(amount, percent)),
                _ => None,
            }
        } else {
            None
        };

        let next_followup_date = effect
            .schedules_next
            .then(|| add_business_days(Utc::now().date_naive(), RESCHEDULE_BUSINESS_DAYS));

        self.ctx
            .store
            .apply_followup(FollowupUpdate {
                assignment_id: assignment.id,
                lead_id: lead.id,
                assignment_status: effect.assignment_status,
                response: req.status,
                lead_status: effect.lead_status,
                next_followup_date,
                notes: req.notes,
                commission_amount_cents,
            })
            .await
    }

    /// The scheduled reminder sweep. `followup_sent_at` is the per-row
    /// idempotency sentinel, so a doubled cron tick sends nothing twice.
    pub async fn sweep(&self) -> Result<FollowupSweepReport> {
        let store = &self.ctx.store;
        let today = Utc::now().date_naive();

        let due = store.followups_due(today).await?;
        let mut report = FollowupSweepReport {
            due: due.len(),
            ..Default::default()
        };

        for assignment in due {
            let Some(lead) = store.lead(assignment.lead_id).await? else {
                warn!(assignment = %assignment.id, "Follow-up due for missing lead");
                report.skipped += 1;
                continue;
            };
            let Some(broker) = store.broker(assignment.broker_id).await? else {
                warn!(assignment = %assignment.id, "Follow-up due for missing broker");
                report.skipped += 1;
                continue;
            };

            let link = format!(
                "{}/api/followups/{}/{}",
                self.ctx.base_url, assignment.id, assignment.access_token
            );
            let email = messages::followup_request(&broker, &lead, &link, assignment.id);

            match store.mark_followup_sent(assignment.id, email).await? {
                Some(outbox_row) => {
                    let _ = outbox::try_send(store, self.ctx.mailer.as_ref(), &outbox_row).await;
                    report.requested += 1;
                }
                None => report.skipped += 1,
            }
        }

        Ok(report)
    }

    async fn load_lead(&self, assignment: &LeadAssignment) -> Result<Lead> {
        self.ctx
            .store
            .lead(assignment.lead_id)
            .await?
            .ok_or_else(|| LeadflowError::NotFound(format!("lead {}", assignment.lead_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_the_contract() {
        let e = followup_effect(FollowupResponse::NotReached);
        assert_eq!(e.assignment_status, AssignmentStatus::Returned);
        assert_eq!(e.lead_status, LeadStatus::Available);
        assert!(!e.schedules_next);

        let e = followup_effect(FollowupResponse::Reached);
        assert_eq!(e.assignment_status, AssignmentStatus::InProgress);
        assert_eq!(e.lead_status, LeadStatus::Assigned);
        assert!(e.schedules_next);

        let e = followup_effect(FollowupResponse::Scheduled);
        assert_eq!(e.assignment_status, AssignmentStatus::Scheduled);
        assert_eq!(e.lead_status, LeadStatus::Assigned);
        assert!(e.schedules_next);

        let e = followup_effect(FollowupResponse::Closed);
        assert_eq!(e.assignment_status, AssignmentStatus::Success);
        assert_eq!(e.lead_status, LeadStatus::Closed);
        assert!(!e.schedules_next);
    }

    #[test]
    fn commission_is_amount_times_percent() {
        // 500.00 at 50% => 250.00
        assert_eq!(commission_cents(50_000, 50.0), 25_000);
        assert_eq!(commission_cents(100_000, 12.5), 12_500);
        // Rounds to the nearest cent
        assert_eq!(commission_cents(333, 33.3), 111);
    }

    #[test]
    fn cooldown_applies_to_fresh_non_terminal_responses() {
        let now = Utc::now();
        let just_now = Some(now - Duration::minutes(5));
        assert!(in_cooldown(
            Some(FollowupResponse::Reached),
            None,
            just_now,
            now
        ));
        assert!(in_cooldown(
            Some(FollowupResponse::Scheduled),
            None,
            just_now,
            now
        ));
    }

    #[test]
    fn cooldown_expires_after_an_hour() {
        let now = Utc::now();
        let earlier = Some(now - Duration::minutes(90));
        assert!(!in_cooldown(
            Some(FollowupResponse::Reached),
            None,
            earlier,
            now
        ));
    }

    #[test]
    fn cooldown_lifts_once_the_next_reminder_went_out() {
        let now = Utc::now();
        let just_now = Some(now - Duration::minutes(5));
        // followup_sent_at set => the next cycle is open
        assert!(!in_cooldown(
            Some(FollowupResponse::Reached),
            Some(now),
            just_now,
            now
        ));
    }

    #[test]
    fn no_response_yet_is_never_in_cooldown() {
        let now = Utc::now();
        assert!(!in_cooldown(None, None, None, now));
    }
}
