//! Derived figures recomputed on read: earnings, hours, project spend and
//! the per-contractor grouping behind the pending-hours view.
//!
//! Project spend uses the contractor's *current* hourly rate,
//! whereas payments snapshot the rate when they are created. The two totals
//! may diverge after a rate change.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{Contractor, Payment, Project, TimeEntry},
    workflow::{PaymentStatus, TimeEntryStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub total_hours: f64,
    pub pending_hours: f64,
    pub total_spent: f64,
    pub budget_remaining: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PendingGroup {
    pub contractor: Contractor,
    pub entries: Vec<(TimeEntry, Project)>,
    pub total_hours: f64,
    pub total_amount: f64,
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn total_hours<'a>(entries: impl IntoIterator<Item = &'a TimeEntry>) -> f64 {
    entries.into_iter().map(|entry| entry.total_hours).sum()
}

/// Net amount of payments that reached PAID.
pub fn paid_earnings<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> f64 {
    round_cents(
        payments
            .into_iter()
            .filter(|payment| payment.status == PaymentStatus::Paid.as_str())
            .map(|payment| payment.net_amount)
            .sum(),
    )
}

/// Net amount still in flight: anything neither paid nor dead.
pub fn pending_earnings<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> f64 {
    const IN_FLIGHT: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Approved,
        PaymentStatus::Processing,
        PaymentStatus::InTransit,
    ];

    round_cents(
        payments
            .into_iter()
            .filter(|payment| IN_FLIGHT.iter().any(|status| payment.status == status.as_str()))
            .map(|payment| payment.net_amount)
            .sum(),
    )
}

/// `entries` pairs every time entry of the project with its contractor's
/// current hourly rate.
pub fn project_stats<'a>(
    entries: impl IntoIterator<Item = (&'a TimeEntry, f64)>,
    budget: Option<f64>,
) -> ProjectStats {
    let mut total_hours = 0.0;
    let mut pending_hours = 0.0;
    let mut total_spent = 0.0;

    for (entry, hourly_rate) in entries {
        total_hours += entry.total_hours;
        if entry.status == TimeEntryStatus::Pending.as_str() {
            pending_hours += entry.total_hours;
        } else if entry.status == TimeEntryStatus::Approved.as_str() {
            total_spent += entry.total_hours * hourly_rate;
        }
    }

    let total_spent = round_cents(total_spent);
    ProjectStats {
        total_hours,
        pending_hours,
        total_spent,
        budget_remaining: budget.map(|budget| round_cents(budget - total_spent)),
    }
}

/// Groups rows by contractor, keeping the order in which each contractor first appears.
pub fn group_pending(rows: Vec<(TimeEntry, Contractor, Project)>) -> Vec<PendingGroup> {
    let mut groups: Vec<PendingGroup> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for (entry, contractor, project) in rows {
        let index = match positions.get(&contractor.id) {
            Some(index) => *index,
            None => {
                positions.insert(contractor.id, groups.len());
                groups.push(PendingGroup {
                    contractor,
                    entries: Vec::new(),
                    total_hours: 0.0,
                    total_amount: 0.0,
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[index];
        group.total_hours += entry.total_hours;
        group.total_amount += entry.total_hours * group.contractor.hourly_rate;
        group.entries.push((entry, project));
    }

    for group in &mut groups {
        group.total_amount = round_cents(group.total_amount);
    }

    groups
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn contractor(rate: f64) -> Contractor {
        let now = Utc::now().naive_utc();
        Contractor {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            phone: None,
            country: "GB".into(),
            timezone: None,
            hourly_rate: rate,
            weekly_cap: None,
            skills: Vec::new(),
            bio: None,
            status: "ACTIVE".into(),
            checkr_candidate_id: None,
            checkr_status: None,
            payment_eligible: false,
            deel_contract_id: None,
            time_tracking_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn project() -> Project {
        let now = Utc::now().naive_utc();
        Project {
            id: Uuid::new_v4(),
            name: "Labeling".into(),
            code: "LBL".into(),
            client: None,
            description: None,
            budget: None,
            start_date: None,
            end_date: None,
            status: "ACTIVE".into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(contractor_id: Uuid, hours: f64, status: TimeEntryStatus) -> TimeEntry {
        let now = Utc::now().naive_utc();
        TimeEntry {
            id: Uuid::new_v4(),
            contractor_id,
            project_id: Uuid::new_v4(),
            work_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            total_hours: hours,
            productive_hours: hours,
            notes: None,
            status: status.as_str().into(),
            source: "MANUAL".into(),
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment(net: f64, status: PaymentStatus) -> Payment {
        let now = Utc::now().naive_utc();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        Payment {
            id: Uuid::new_v4(),
            contractor_id: Uuid::new_v4(),
            period_start: day,
            period_end: day,
            total_hours: 0.0,
            hourly_rate: 0.0,
            gross_amount: net,
            net_amount: net,
            status: status.as_str().into(),
            external_payment_id: None,
            approved_at: None,
            processed_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn project_spend_counts_only_approved_hours_at_current_rate() {
        let id = Uuid::new_v4();
        let approved = entry(id, 8.0, TimeEntryStatus::Approved);
        let pending = entry(id, 3.0, TimeEntryStatus::Pending);
        let rejected = entry(id, 5.0, TimeEntryStatus::Rejected);

        let stats = project_stats(
            [(&approved, 50.0), (&pending, 50.0), (&rejected, 50.0)],
            Some(1000.0),
        );

        assert_eq!(stats.total_hours, 16.0);
        assert_eq!(stats.pending_hours, 3.0);
        assert_eq!(stats.total_spent, 400.0);
        assert_eq!(stats.budget_remaining, Some(600.0));
    }

    #[test]
    fn budget_remaining_may_go_negative() {
        let approved = entry(Uuid::new_v4(), 10.0, TimeEntryStatus::Approved);
        let stats = project_stats([(&approved, 30.0)], Some(100.0));
        assert_eq!(stats.budget_remaining, Some(-200.0));

        let unbudgeted = project_stats([(&approved, 30.0)], None);
        assert_eq!(unbudgeted.budget_remaining, None);
    }

    #[test]
    fn earnings_split_paid_from_in_flight() {
        let payments = vec![
            payment(200.0, PaymentStatus::Paid),
            payment(150.5, PaymentStatus::Paid),
            payment(80.0, PaymentStatus::Approved),
            payment(20.0, PaymentStatus::InTransit),
            payment(999.0, PaymentStatus::Cancelled),
            payment(999.0, PaymentStatus::Failed),
        ];

        assert_eq!(paid_earnings(&payments), 350.5);
        assert_eq!(pending_earnings(&payments), 100.0);
    }

    #[test]
    fn pending_groups_follow_first_appearance_and_sum_amounts() {
        let fast = contractor(40.0);
        let slow = contractor(25.0);
        let rows = vec![
            (entry(fast.id, 4.0, TimeEntryStatus::Pending), fast.clone(), project()),
            (entry(slow.id, 2.0, TimeEntryStatus::Pending), slow.clone(), project()),
            (entry(fast.id, 1.5, TimeEntryStatus::Pending), fast.clone(), project()),
        ];

        let groups = group_pending(rows);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].contractor.id, fast.id);
        assert_eq!(groups[0].entries.len(), 2);
        assert_eq!(groups[0].total_hours, 5.5);
        assert_eq!(groups[0].total_amount, 220.0);
        assert_eq!(groups[1].contractor.id, slow.id);
        assert_eq!(groups[1].total_amount, 50.0);
    }

    #[test]
    fn total_hours_sums_every_entry() {
        let id = Uuid::new_v4();
        let entries = [
            entry(id, 7.5, TimeEntryStatus::Approved),
            entry(id, 0.5, TimeEntryStatus::Rejected),
        ];
        assert_eq!(total_hours(&entries), 8.0);
    }
}
