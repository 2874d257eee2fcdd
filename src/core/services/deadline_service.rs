//! Deadline urgency classification for outstanding dues.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::services::ServiceResult;
use crate::domain::payment::ApprovalStatus;
use crate::domain::views::{DeadlineStatus, PaymentProgress, Urgency};
use crate::store::{PaymentFilter, RecordStore};

const CRITICAL_WINDOW_DAYS: i64 = 1;
const HIGH_WINDOW_DAYS: i64 = 3;
const MEDIUM_WINDOW_DAYS: i64 = 7;

/// Derives per-student payment progress and urgency tiers for every active
/// obligation that carries a deadline.
pub struct DeadlineService;

impl DeadlineService {
    /// Display-ready reminder rows for one student, most urgent first.
    ///
    /// `level` is the student's cohort tag; obligations targeting other
    /// cohorts are skipped. Paid obligations stay visible briefly before
    /// the deadline for confirmation; reminders more than a week stale are
    /// dropped.
    pub fn classify(
        store: &dyn RecordStore,
        config: &EngineConfig,
        student_id: Uuid,
        level: Option<&str>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<DeadlineStatus>> {
        let mut rows = Vec::new();
        for obligation in store.list_obligations()? {
            if !obligation.is_active || !obligation.targets_level(level) {
                continue;
            }
            let Some(deadline) = obligation.deadline else {
                continue;
            };

            let filter = PaymentFilter {
                obligation_id: Some(obligation.id),
                status: Some(ApprovalStatus::Approved),
                ..PaymentFilter::for_student(student_id)
            };
            let approved = store.list_payments(&filter)?;
            let waived = approved.iter().any(|payment| payment.waived);
            let amount_paid: i64 = approved
                .iter()
                .filter(|payment| !payment.waived)
                .map(|payment| payment.amount)
                .sum();

            let progress = if amount_paid >= obligation.amount || waived {
                PaymentProgress::Paid
            } else if amount_paid > 0 && obligation.allows_partial {
                PaymentProgress::Partial
            } else {
                PaymentProgress::Unpaid
            };

            let days_left = days_until(deadline, now);
            if days_left < -config.stale_reminder_days {
                continue;
            }
            if progress == PaymentProgress::Paid && days_left > config.paid_confirmation_days {
                continue;
            }

            let unpaid = progress != PaymentProgress::Paid;
            let urgency = if days_left < 0 || (days_left <= CRITICAL_WINDOW_DAYS && unpaid) {
                Urgency::Critical
            } else if days_left <= HIGH_WINDOW_DAYS && unpaid {
                Urgency::High
            } else if days_left <= MEDIUM_WINDOW_DAYS {
                Urgency::Medium
            } else {
                Urgency::Low
            };

            rows.push(DeadlineStatus {
                obligation_id: obligation.id,
                title: obligation.title.clone(),
                amount_due: obligation.amount,
                amount_paid,
                progress,
                days_left,
                urgency,
            });
        }

        rows.sort_by(|a, b| {
            a.urgency
                .rank()
                .cmp(&b.urgency.rank())
                .then(a.days_left.cmp(&b.days_left))
        });
        Ok(rows)
    }
}

/// Days until `deadline`, rounded up; negative once overdue.
fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta = deadline - now;
    let days = delta.num_days();
    let remainder = delta.num_seconds() - days * 86_400;
    if remainder > 0 {
        days + 1
    } else {
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::obligation::ObligationDraft;
    use crate::domain::payment::{PaymentDraft, PaymentMethod};
    use crate::store::{MemoryStore, PaymentResolution};
    use chrono::Duration;

    fn reference_now() -> DateTime<Utc> {
        // Fixed clock keeps the day arithmetic deterministic.
        DateTime::parse_from_rfc3339("2026-03-02T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn add_obligation(
        store: &MemoryStore,
        title: &str,
        amount: i64,
        deadline_in_days: i64,
        allows_partial: bool,
        now: DateTime<Utc>,
    ) -> Uuid {
        store
            .insert_obligation(
                ObligationDraft::new(title, amount)
                    .with_deadline(now + Duration::days(deadline_in_days))
                    .with_partial(allows_partial),
                now,
            )
            .unwrap()
            .id
    }

    fn approve(store: &MemoryStore, student: Uuid, obligation: Uuid, amount: i64, waived: bool) {
        let now = reference_now();
        let payment = store
            .insert_payment(
                PaymentDraft::new(student, obligation, amount, PaymentMethod::Cash),
                now,
            )
            .unwrap();
        store
            .resolve_payment(
                payment.id,
                PaymentResolution::Approve {
                    approved_at: now,
                    waived,
                },
            )
            .unwrap();
    }

    #[test]
    fn unpaid_two_days_out_is_high() {
        let store = MemoryStore::new();
        let now = reference_now();
        add_obligation(&store, "Field trip", 5_000, 2, false, now);
        let student = Uuid::new_v4();

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].progress, PaymentProgress::Unpaid);
        assert_eq!(rows[0].days_left, 2);
        assert_eq!(rows[0].urgency, Urgency::High);
    }

    #[test]
    fn waived_approval_counts_as_paid_with_zero_collected() {
        let store = MemoryStore::new();
        let now = reference_now();
        let obligation = add_obligation(&store, "Dues", 5_000, 2, false, now);
        let student = Uuid::new_v4();
        approve(&store, student, obligation, 0, true);

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        assert_eq!(rows.len(), 1, "paid but imminent stays visible");
        assert_eq!(rows[0].progress, PaymentProgress::Paid);
        assert_eq!(rows[0].amount_paid, 0);
    }

    #[test]
    fn partial_progress_requires_the_obligation_to_allow_it() {
        let store = MemoryStore::new();
        let now = reference_now();
        let strict = add_obligation(&store, "Strict", 5_000, 5, false, now);
        let lenient = add_obligation(&store, "Lenient", 5_000, 5, true, now);
        let student = Uuid::new_v4();
        approve(&store, student, strict, 2_000, false);
        approve(&store, student, lenient, 2_000, false);

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        let strict_row = rows.iter().find(|r| r.obligation_id == strict).unwrap();
        let lenient_row = rows.iter().find(|r| r.obligation_id == lenient).unwrap();
        assert_eq!(strict_row.progress, PaymentProgress::Unpaid);
        assert_eq!(lenient_row.progress, PaymentProgress::Partial);
    }

    #[test]
    fn overdue_is_critical_even_when_paid() {
        let store = MemoryStore::new();
        let now = reference_now();
        let obligation = add_obligation(&store, "Late", 1_000, -2, false, now);
        let student = Uuid::new_v4();
        approve(&store, student, obligation, 1_000, false);

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].progress, PaymentProgress::Paid);
        assert_eq!(rows[0].urgency, Urgency::Critical);
    }

    #[test]
    fn stale_and_comfortably_paid_reminders_are_dropped() {
        let store = MemoryStore::new();
        let now = reference_now();
        // Ten days overdue: too stale to matter.
        add_obligation(&store, "Ancient", 1_000, -10, false, now);
        // Paid and two weeks away: nothing to confirm yet.
        let distant = add_obligation(&store, "Distant", 1_000, 14, false, now);
        let student = Uuid::new_v4();
        approve(&store, student, distant, 1_000, false);

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        assert!(rows.iter().all(|r| r.title != "Ancient"));
        assert!(rows.iter().all(|r| r.title != "Distant"));
    }

    #[test]
    fn rows_sort_by_urgency_then_days_left() {
        let store = MemoryStore::new();
        let now = reference_now();
        add_obligation(&store, "Medium", 1_000, 6, false, now);
        add_obligation(&store, "Overdue", 1_000, -1, false, now);
        add_obligation(&store, "Soon", 1_000, 3, false, now);
        add_obligation(&store, "Today", 1_000, 1, false, now);
        let student = Uuid::new_v4();

        let rows =
            DeadlineService::classify(&store, &EngineConfig::default(), student, None, now)
                .unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Overdue", "Today", "Soon", "Medium"]);
    }

    #[test]
    fn cohort_targeting_filters_obligations() {
        let store = MemoryStore::new();
        let now = reference_now();
        let mut draft = ObligationDraft::new("Seniors only", 1_000)
            .with_deadline(now + Duration::days(2));
        draft.target_levels.insert("senior".into());
        store.insert_obligation(draft, now).unwrap();
        add_obligation(&store, "Everyone", 1_000, 2, false, now);
        let student = Uuid::new_v4();

        let junior = DeadlineService::classify(
            &store,
            &EngineConfig::default(),
            student,
            Some("junior"),
            now,
        )
        .unwrap();
        assert_eq!(junior.len(), 1);
        assert_eq!(junior[0].title, "Everyone");

        let senior = DeadlineService::classify(
            &store,
            &EngineConfig::default(),
            student,
            Some("senior"),
            now,
        )
        .unwrap();
        assert_eq!(senior.len(), 2);
    }

    #[test]
    fn ceiling_day_arithmetic() {
        let now = reference_now();
        assert_eq!(days_until(now + Duration::hours(12), now), 1);
        assert_eq!(days_until(now + Duration::days(2), now), 2);
        assert_eq!(days_until(now - Duration::hours(12), now), 0);
        assert_eq!(days_until(now - Duration::days(3), now), -3);
    }
}
