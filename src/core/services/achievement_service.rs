//! Streak and achievement derivations over a student's payment history.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::services::ServiceResult;
use crate::domain::obligation::PaymentObligation;
use crate::domain::payment::{ApprovalStatus, Payment};
use crate::domain::views::{AchievementReport, Badge, StreakState};
use crate::store::{PaymentFilter, RecordStore};

const FIRST_PAYMENT_COUNT: usize = 1;
const CONSISTENT_COUNT: usize = 5;
const STREAK_BADGE_LENGTH: u32 = 3;
const HELPER_COUNT: usize = 1;
const DEDICATED_HELPER_COUNT: usize = 5;
const PERFECT_RECORD_COUNT: usize = 3;

/// Evaluates streaks and badge gates on demand. Nothing here is persisted:
/// an amendment to the underlying records changes the next evaluation, so
/// there is no earned flag to drift out of sync.
pub struct AchievementService;

impl AchievementService {
    pub fn evaluate(
        store: &dyn RecordStore,
        config: &EngineConfig,
        student_id: Uuid,
    ) -> ServiceResult<AchievementReport> {
        // Waived approvals satisfy obligations without moving money, so
        // they qualify for neither streaks nor badges.
        let filter = PaymentFilter {
            status: Some(ApprovalStatus::Approved),
            waived: Some(false),
            ..PaymentFilter::for_student(student_id)
        };
        let qualifying = store.list_payments(&filter)?;
        let streak = walk_streak(&qualifying, config.streak_window_days);

        let rejected_filter = PaymentFilter {
            status: Some(ApprovalStatus::Rejected),
            ..PaymentFilter::for_student(student_id)
        };
        let rejected_count = store.list_payments(&rejected_filter)?.len();

        let helper_filter = PaymentFilter {
            paid_by: Some(student_id),
            status: Some(ApprovalStatus::Approved),
            waived: Some(false),
            ..PaymentFilter::default()
        };
        let helper_count = store
            .list_payments(&helper_filter)?
            .iter()
            .filter(|payment| payment.is_on_behalf())
            .count();

        let obligations: HashMap<Uuid, PaymentObligation> = store
            .list_obligations()?
            .into_iter()
            .map(|obligation| (obligation.id, obligation))
            .collect();
        let early_payer = qualifying.iter().any(|payment| {
            match obligations.get(&payment.obligation_id) {
                Some(obligation) => obligation
                    .deadline
                    .is_some_and(|deadline| payment.created_at < deadline),
                None => {
                    tracing::warn!(
                        payment_id = %payment.id,
                        obligation_id = %payment.obligation_id,
                        "payment references unknown obligation; skipped for badges"
                    );
                    false
                }
            }
        });

        let count = qualifying.len();
        let total: i64 = qualifying.iter().map(|payment| payment.amount).sum();

        let mut achievements = Vec::new();
        if count >= FIRST_PAYMENT_COUNT {
            achievements.push(Badge::FirstPayment);
        }
        if early_payer {
            achievements.push(Badge::EarlyBird);
        }
        if count >= CONSISTENT_COUNT {
            achievements.push(Badge::Consistent);
        }
        if streak.longest_streak >= STREAK_BADGE_LENGTH {
            achievements.push(Badge::StreakKeeper);
        }
        if helper_count >= HELPER_COUNT {
            achievements.push(Badge::Helper);
        }
        if helper_count >= DEDICATED_HELPER_COUNT {
            achievements.push(Badge::DedicatedHelper);
        }
        if total >= config.big_contributor_total {
            achievements.push(Badge::BigContributor);
        }
        if count >= PERFECT_RECORD_COUNT && rejected_count == 0 {
            achievements.push(Badge::PerfectRecord);
        }

        Ok(AchievementReport {
            student_id,
            achievements,
            streak,
        })
    }
}

/// Walks consecutive payment pairs: a gap within the window extends the
/// running streak, anything longer resets it to one. The current streak is
/// the trailing run, not necessarily the longest.
fn walk_streak(payments: &[Payment], window_days: i64) -> StreakState {
    let mut running = 0u32;
    let mut longest = 0u32;
    let mut last: Option<DateTime<Utc>> = None;
    for payment in payments {
        // Exact duration, not truncated whole days: thirty days plus an
        // hour is outside a thirty-day window.
        running = match last {
            Some(previous) if payment.created_at - previous <= Duration::days(window_days) => {
                running + 1
            }
            _ => 1,
        };
        longest = longest.max(running);
        last = Some(payment.created_at);
    }
    StreakState {
        current_streak: running,
        longest_streak: longest,
        last_payment_date: last,
    }
}
