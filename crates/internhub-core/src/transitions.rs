// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status lifecycles for applications, internships, companies and users.
//!
//! ```text
//! Application
//!   PENDING ──► REVIEWING ──► SHORTLISTED ──► ACCEPTED
//!      │            │              │       └─► REJECTED
//!      │            │              └─────────► WITHDRAWN
//!      └────────────┴──► (ACCEPTED | REJECTED | WITHDRAWN directly)
//!
//! Internship
//!   DRAFT ──► PENDING_REVIEW ──► OPEN ◄──► CLOSED
//!     ▲              │
//!     └── REJECTED ◄─┘
//!
//! Company
//!   PENDING ──► APPROVED ◄──► SUSPENDED
//!     ▲   └───► REJECTED
//!     └────────────┘
//! ```

use crate::error::CoreError;
use crate::models::{ApplicationStatus, CompanyStatus, InternshipStatus, UserStatus};

/// A status with a fixed set of allowed successors.
pub trait Lifecycle: Copy + Eq + AsRef<str> + 'static {
    /// Entity name used in errors.
    const ENTITY: &'static str;

    /// Statuses reachable in one step.
    fn allowed_next(self) -> &'static [Self];

    /// Whether no further transition is possible.
    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Whether `self -> next` is allowed.
    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }
}

/// Validate a transition, producing `InvalidTransition` when it is not allowed.
pub fn ensure_transition<S: Lifecycle>(from: S, to: S) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            entity: S::ENTITY,
            from: from.as_ref().to_string(),
            to: to.as_ref().to_string(),
        })
    }
}

impl Lifecycle for ApplicationStatus {
    const ENTITY: &'static str = "application";

    fn allowed_next(self) -> &'static [Self] {
        use ApplicationStatus::*;
        match self {
            Pending => &[Reviewing, Shortlisted, Accepted, Rejected, Withdrawn],
            Reviewing => &[Shortlisted, Accepted, Rejected, Withdrawn],
            Shortlisted => &[Accepted, Rejected, Withdrawn],
            Accepted | Rejected | Withdrawn => &[],
        }
    }
}

impl Lifecycle for InternshipStatus {
    const ENTITY: &'static str = "internship";

    fn allowed_next(self) -> &'static [Self] {
        use InternshipStatus::*;
        match self {
            Draft => &[PendingReview],
            PendingReview => &[Open, Rejected],
            Open => &[Closed],
            Closed => &[Open],
            Rejected => &[Draft],
        }
    }
}

impl Lifecycle for CompanyStatus {
    const ENTITY: &'static str = "company";

    fn allowed_next(self) -> &'static [Self] {
        use CompanyStatus::*;
        match self {
            Pending => &[Approved, Rejected],
            Approved => &[Suspended],
            Suspended => &[Approved],
            Rejected => &[Pending],
        }
    }
}

impl Lifecycle for UserStatus {
    const ENTITY: &'static str = "user";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            UserStatus::Active => &[UserStatus::Suspended],
            UserStatus::Suspended => &[UserStatus::Active],
        }
    }
}

/// Who may move an application into a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationParty {
    /// The student who applied.
    Applicant,
    /// The company owning the internship, or a moderator.
    Reviewer,
}

/// The party entitled to set `to` on an application.
pub fn application_party(to: ApplicationStatus) -> ApplicationParty {
    match to {
        ApplicationStatus::Withdrawn => ApplicationParty::Applicant,
        _ => ApplicationParty::Reviewer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_application_terminal_states() {
        for status in ApplicationStatus::iter() {
            let terminal = matches!(
                status,
                ApplicationStatus::Accepted
                    | ApplicationStatus::Rejected
                    | ApplicationStatus::Withdrawn
            );
            assert_eq!(status.is_terminal(), terminal, "{status}");
        }
    }

    #[test]
    fn test_application_cannot_go_backwards() {
        assert!(ensure_transition(ApplicationStatus::Shortlisted, ApplicationStatus::Pending).is_err());
        assert!(ensure_transition(ApplicationStatus::Reviewing, ApplicationStatus::Pending).is_err());
        assert!(ensure_transition(ApplicationStatus::Pending, ApplicationStatus::Reviewing).is_ok());
    }

    #[test]
    fn test_same_state_is_rejected() {
        for status in ApplicationStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
        for status in InternshipStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
        for status in CompanyStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_internship_lifecycle() {
        use InternshipStatus::*;
        assert!(Draft.can_transition_to(PendingReview));
        assert!(!Draft.can_transition_to(Open));
        assert!(PendingReview.can_transition_to(Open));
        assert!(Open.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Open));
        assert!(Rejected.can_transition_to(Draft));
        assert!(!Rejected.can_transition_to(Open));
    }

    #[test]
    fn test_company_lifecycle() {
        use CompanyStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(!Pending.can_transition_to(Suspended));
        assert!(Approved.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Approved));
        assert!(Rejected.can_transition_to(Pending));
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = ensure_transition(CompanyStatus::Pending, CompanyStatus::Suspended).unwrap_err();
        match err {
            CoreError::InvalidTransition { entity, from, to } => {
                assert_eq!(entity, "company");
                assert_eq!(from, "PENDING");
                assert_eq!(to, "SUSPENDED");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_application_party() {
        assert_eq!(
            application_party(ApplicationStatus::Withdrawn),
            ApplicationParty::Applicant
        );
        assert_eq!(
            application_party(ApplicationStatus::Accepted),
            ApplicationParty::Reviewer
        );
    }
}
