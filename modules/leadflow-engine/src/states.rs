//! The entity state machines, in one place. Every mutation that moves a
//! status goes through an `ensure_*` check first; an edge missing from these
//! tables is a rejected request, not a silent overwrite.

use leadflow_common::types::{AssignmentStatus, InvoiceStatus, LeadStatus, PackageStatus};
use leadflow_common::{LeadflowError, Result};

pub fn lead_can_transition(from: LeadStatus, to: LeadStatus) -> bool {
    use LeadStatus::*;
    matches!(
        (from, to),
        (New, Available)
            | (New, Reserved)
            | (New, Assigned)
            | (New, Closed)
            | (Available, Reserved)
            | (Available, Assigned)
            | (Available, Closed)
            | (Reserved, Available)
            | (Reserved, Assigned)
            | (Reserved, Closed)
            | (Assigned, Available)
            | (Assigned, Closed)
    )
}

pub fn assignment_can_transition(from: AssignmentStatus, to: AssignmentStatus) -> bool {
    use AssignmentStatus::*;
    matches!(
        (from, to),
        (Pending, Sent)
            | (Sent, InProgress)
            | (Sent, Scheduled)
            | (Sent, Returned)
            | (Sent, Success)
            | (InProgress, InProgress)
            | (InProgress, Scheduled)
            | (InProgress, Returned)
            | (InProgress, Success)
            | (Scheduled, InProgress)
            | (Scheduled, Scheduled)
            | (Scheduled, Returned)
            | (Scheduled, Success)
    )
}

pub fn invoice_can_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    use InvoiceStatus::*;
    matches!(
        (from, to),
        (Pending, Sent) | (Pending, Paid) | (Pending, Cancelled) | (Sent, Paid) | (Sent, Cancelled)
    )
}

pub fn package_can_transition(from: PackageStatus, to: PackageStatus) -> bool {
    use PackageStatus::*;
    matches!(
        (from, to),
        (Pending, Paid)
            | (Pending, Active)
            | (Pending, Completed)
            | (Pending, Cancelled)
            | (Paid, Active)
            | (Paid, Completed)
            | (Active, Completed)
            | (Active, Cancelled)
    )
}

pub fn ensure_lead(from: LeadStatus, to: LeadStatus) -> Result<()> {
    if from == to || lead_can_transition(from, to) {
        Ok(())
    } else {
        Err(transition_err("lead", from, to))
    }
}

pub fn ensure_assignment(from: AssignmentStatus, to: AssignmentStatus) -> Result<()> {
    if assignment_can_transition(from, to) {
        Ok(())
    } else {
        Err(transition_err("assignment", from, to))
    }
}

pub fn ensure_invoice(from: InvoiceStatus, to: InvoiceStatus) -> Result<()> {
    if invoice_can_transition(from, to) {
        Ok(())
    } else {
        Err(transition_err("invoice", from, to))
    }
}

pub fn ensure_package(from: PackageStatus, to: PackageStatus) -> Result<()> {
    if package_can_transition(from, to) {
        Ok(())
    } else {
        Err(transition_err("package", from, to))
    }
}

fn transition_err(
    entity: &'static str,
    from: impl std::fmt::Display,
    to: impl std::fmt::Display,
) -> LeadflowError {
    LeadflowError::Transition {
        entity,
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_common::types::{AssignmentStatus as A, LeadStatus as L, PackageStatus as P};

    #[test]
    fn closed_lead_is_terminal() {
        for to in [L::New, L::Available, L::Reserved, L::Assigned] {
            assert!(!lead_can_transition(L::Closed, to));
        }
    }

    #[test]
    fn returned_lead_becomes_assignable_again() {
        assert!(lead_can_transition(L::Assigned, L::Available));
        assert!(lead_can_transition(L::Available, L::Assigned));
    }

    #[test]
    fn terminal_assignments_accept_nothing() {
        for from in [A::Returned, A::Success] {
            for to in [A::Pending, A::Sent, A::InProgress, A::Scheduled, A::Returned, A::Success] {
                assert!(!assignment_can_transition(from, to));
            }
        }
    }

    #[test]
    fn pending_assignment_only_moves_to_sent() {
        assert!(assignment_can_transition(A::Pending, A::Sent));
        for to in [A::InProgress, A::Scheduled, A::Returned, A::Success] {
            assert!(!assignment_can_transition(A::Pending, to));
        }
    }

    #[test]
    fn repeated_follow_up_keeps_in_progress() {
        assert!(assignment_can_transition(A::InProgress, A::InProgress));
        assert!(assignment_can_transition(A::Scheduled, A::InProgress));
    }

    #[test]
    fn paid_invoice_is_terminal() {
        use leadflow_common::types::InvoiceStatus as I;
        assert!(!invoice_can_transition(I::Paid, I::Pending));
        assert!(!invoice_can_transition(I::Paid, I::Cancelled));
        assert!(!invoice_can_transition(I::Cancelled, I::Paid));
    }

    #[test]
    fn package_lifecycle_edges() {
        assert!(package_can_transition(P::Pending, P::Active));
        assert!(package_can_transition(P::Pending, P::Completed));
        assert!(package_can_transition(P::Active, P::Completed));
        assert!(!package_can_transition(P::Completed, P::Active));
    }

    #[test]
    fn ensure_lead_allows_noop() {
        assert!(ensure_lead(L::Assigned, L::Assigned).is_ok());
    }
}
