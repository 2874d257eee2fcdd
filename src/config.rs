use serde::{Deserialize, Serialize};

/// Balance floor (smallest currency unit) below which an expense advisory
/// turns into a warning.
pub const LOW_BALANCE_THRESHOLD: i64 = 15_000;

/// Maximum gap in days between two payments that still extends a streak.
pub const STREAK_WINDOW_DAYS: i64 = 30;

/// Lifetime contribution total (smallest currency unit) that unlocks the
/// big-contributor badge.
pub const BIG_CONTRIBUTOR_TOTAL: i64 = 50_000;

/// Contract constants for balance advisories, reminders, and achievements.
///
/// The defaults are part of the observable contract; collaborators may tune
/// them per deployment, never per call site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Post-approval balances below this trigger a warning advisory.
    pub low_balance_threshold: i64,
    /// Streak continuity window between consecutive payments, in days.
    pub streak_window_days: i64,
    /// Lifetime total unlocking the big-contributor badge.
    pub big_contributor_total: i64,
    /// Reminders older than this many days past the deadline are dropped.
    pub stale_reminder_days: i64,
    /// Paid obligations stay visible this many days before the deadline so
    /// students can confirm the payment landed.
    pub paid_confirmation_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_balance_threshold: LOW_BALANCE_THRESHOLD,
            streak_window_days: STREAK_WINDOW_DAYS,
            big_contributor_total: BIG_CONTRIBUTOR_TOTAL,
            stale_reminder_days: 7,
            paid_confirmation_days: 3,
        }
    }
}
