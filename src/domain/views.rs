use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::obligation::FundingSource;

/// Derived balance of one funding source. Never persisted; always recomputed
/// from the current record set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundingSourceBalance {
    pub source: FundingSource,
    /// Σ approved, non-waived payment amounts for the source.
    pub collected: i64,
    /// Σ approved expense amounts funded by the source.
    pub spent: i64,
    pub balance: i64,
}

impl FundingSourceBalance {
    pub fn from_parts(source: FundingSource, collected: i64, spent: i64) -> Self {
        Self {
            source,
            collected,
            spent,
            balance: collected - spent,
        }
    }
}

/// Global treasury view across every funding source seen in the records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasurySummary {
    pub collected: i64,
    pub spent: i64,
    pub remaining: i64,
    pub sources: Vec<FundingSourceBalance>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdLevel {
    Normal,
    Warning,
    Critical,
}

/// Pre-approval risk advisory for a candidate expense. Advisory only: it
/// surfaces risk to the human approver, it never vetoes the transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThresholdAdvice {
    pub source: FundingSource,
    pub level: ThresholdLevel,
    pub current_balance: i64,
    pub balance_after: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProgress {
    Paid,
    Partial,
    Unpaid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Critical => 0,
            Urgency::High => 1,
            Urgency::Medium => 2,
            Urgency::Low => 3,
        }
    }
}

/// Per student × obligation reminder row, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadlineStatus {
    pub obligation_id: Uuid,
    pub title: String,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub progress: PaymentProgress,
    /// Ceiling of the remaining time in days; negative once overdue.
    pub days_left: i64,
    pub urgency: Urgency,
}

/// Consecutive-payment streak over a student's approved, non-waived history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_payment_date: Option<DateTime<Utc>>,
}

/// Badges a student can unlock. Pure derivations over payment history;
/// no earned flag is ever persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstPayment,
    EarlyBird,
    Consistent,
    StreakKeeper,
    Helper,
    DedicatedHelper,
    BigContributor,
    PerfectRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementReport {
    pub student_id: Uuid,
    pub achievements: Vec<Badge>,
    pub streak: StreakState,
}
