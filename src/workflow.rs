//! Status enums for every lifecycle-bearing entity and the transition
//! tables consulted before any status column is written.
//!
//! Statuses are stored as text; handlers parse them into these enums at the
//! boundary and call [`check_transition`] before issuing an update.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} '{value}'. Allowed values: {allowed}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
    pub allowed: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot move {entity} from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownStatus {
                        kind: $kind,
                        value: trimmed.to_string(),
                        allowed: $name::ALL
                            .iter()
                            .map(|candidate| candidate.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

status_enum!(JobStatus, "job status" {
    Draft => "DRAFT",
    Published => "PUBLISHED",
    Closed => "CLOSED",
    Archived => "ARCHIVED",
});

status_enum!(PayType, "pay type" {
    Hourly => "HOURLY",
    PerTask => "PER_TASK",
});

status_enum!(ApplicationStatus, "application status" {
    New => "NEW",
    Reviewing => "REVIEWING",
    Shortlisted => "SHORTLISTED",
    Interviewing => "INTERVIEWING",
    Offered => "OFFERED",
    Hired => "HIRED",
    Rejected => "REJECTED",
    Withdrawn => "WITHDRAWN",
});

status_enum!(ApplicationSource, "application source" {
    LinkedIn => "LINKEDIN",
    Referral => "REFERRAL",
    JobBoard => "JOB_BOARD",
    Website => "WEBSITE",
    Other => "OTHER",
});

status_enum!(InterviewStatus, "interview status" {
    Pending => "PENDING",
    Completed => "COMPLETED",
});

status_enum!(ContractorStatus, "contractor status" {
    Onboarding => "ONBOARDING",
    PendingCheckr => "PENDING_CHECKR",
    Active => "ACTIVE",
    Paused => "PAUSED",
    Offboarded => "OFFBOARDED",
});

status_enum!(
    /// Background-check outcome as reported by the screening vendor.
    CheckStatus, "background check status" {
        Pending => "pending",
        Clear => "clear",
        Consider => "consider",
        Suspended => "suspended",
    }
);

status_enum!(ProjectStatus, "project status" {
    Active => "ACTIVE",
    Paused => "PAUSED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

status_enum!(AssignmentStatus, "assignment status" {
    Active => "ACTIVE",
    Ended => "ENDED",
});

status_enum!(TimeEntryStatus, "time entry status" {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

status_enum!(TimeEntrySource, "time entry source" {
    Manual => "MANUAL",
    Imported => "IMPORTED",
});

status_enum!(PaymentStatus, "payment status" {
    Pending => "PENDING",
    Approved => "APPROVED",
    Processing => "PROCESSING",
    InTransit => "IN_TRANSIT",
    Paid => "PAID",
    Failed => "FAILED",
    Cancelled => "CANCELLED",
});

status_enum!(DocumentType, "document type" {
    Nda => "NDA",
    Ciiaa => "CIIAA",
    TermsOfWork => "TERMS_OF_WORK",
    OfferLetter => "OFFER_LETTER",
    W8Ben => "W8BEN",
    W9 => "W9",
    Other => "OTHER",
});

status_enum!(DocumentStatus, "document status" {
    Pending => "PENDING",
    Sent => "SENT",
    Viewed => "VIEWED",
    Signed => "SIGNED",
    Expired => "EXPIRED",
});

/// A finite status set with an explicit table of allowed moves.
pub trait Lifecycle: Copy + Eq + 'static {
    const ENTITY: &'static str;

    fn as_str(self) -> &'static str;

    fn is_terminal(self) -> bool;

    fn can_transition_to(self, next: Self) -> bool;
}

/// Staying in the current status is always accepted as a no-op.
pub fn check_transition<S: Lifecycle>(from: S, to: S) -> Result<(), TransitionError> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(TransitionError {
            entity: S::ENTITY,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// Parses a list-view status filter where `all` (or nothing) disables filtering.
pub fn parse_filter<S>(raw: Option<&str>) -> Result<Option<S>, UnknownStatus>
where
    S: FromStr<Err = UnknownStatus>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("all") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

impl Lifecycle for JobStatus {
    const ENTITY: &'static str = "job";

    fn as_str(self) -> &'static str {
        JobStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        false
    }

    fn can_transition_to(self, next: Self) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Draft, Published)
                | (Published, Closed)
                | (Closed, Published)
                | (Closed, Archived)
                | (Archived, Draft)
        )
    }
}

impl Lifecycle for ApplicationStatus {
    const ENTITY: &'static str = "application";

    fn as_str(self) -> &'static str {
        ApplicationStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Hired | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ApplicationStatus::*;
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Rejected | Withdrawn) {
            return true;
        }
        matches!(
            (self, next),
            (New, Reviewing)
                | (New, Shortlisted)
                | (Reviewing, Shortlisted)
                | (Shortlisted, Interviewing)
                | (Interviewing, Offered)
                | (Offered, Hired)
        )
    }
}

impl Lifecycle for ContractorStatus {
    const ENTITY: &'static str = "contractor";

    fn as_str(self) -> &'static str {
        ContractorStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        self == ContractorStatus::Offboarded
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ContractorStatus::*;
        if self.is_terminal() {
            return false;
        }
        if next == Offboarded {
            return true;
        }
        matches!(
            (self, next),
            (Onboarding, PendingCheckr)
                | (PendingCheckr, Active)
                | (Active, Paused)
                | (Paused, Active)
        )
    }
}

impl Lifecycle for ProjectStatus {
    const ENTITY: &'static str = "project";

    fn as_str(self) -> &'static str {
        ProjectStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Cancelled)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, next),
            (Active, Paused)
                | (Paused, Active)
                | (Active | Paused, Completed)
                | (Active | Paused, Cancelled)
        )
    }
}

impl Lifecycle for AssignmentStatus {
    const ENTITY: &'static str = "assignment";

    fn as_str(self) -> &'static str {
        AssignmentStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        self == AssignmentStatus::Ended
    }

    fn can_transition_to(self, next: Self) -> bool {
        self == AssignmentStatus::Active && next == AssignmentStatus::Ended
    }
}

impl Lifecycle for TimeEntryStatus {
    const ENTITY: &'static str = "time entry";

    fn as_str(self) -> &'static str {
        TimeEntryStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        self != TimeEntryStatus::Pending
    }

    fn can_transition_to(self, next: Self) -> bool {
        self == TimeEntryStatus::Pending && next != TimeEntryStatus::Pending
    }
}

impl Lifecycle for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn as_str(self) -> &'static str {
        PaymentStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    fn can_transition_to(self, next: Self) -> bool {
        use PaymentStatus::*;
        if self.is_terminal() {
            return false;
        }
        if next == Cancelled {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Approved)
                | (Approved, Processing)
                | (Processing, InTransit)
                | (Processing | InTransit, Paid)
                | (Processing | InTransit, Failed)
        )
    }
}

impl Lifecycle for DocumentStatus {
    const ENTITY: &'static str = "document";

    fn as_str(self) -> &'static str {
        DocumentStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Signed | DocumentStatus::Expired)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use DocumentStatus::*;
        if self.is_terminal() {
            return false;
        }
        if next == Expired {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Sent) | (Sent, Viewed) | (Sent | Viewed, Signed)
        )
    }
}
