pub mod common;
pub mod expense;
pub mod obligation;
pub mod payment;
pub mod views;

pub use common::{Displayable, Identifiable};
pub use expense::{Expense, ExpenseAmendment, ExpenseDraft, ExpenseFields, ExpensePatch};
pub use obligation::{FundingSource, ObligationDraft, PaymentObligation};
pub use payment::{ApprovalStatus, Payment, PaymentDraft, PaymentMethod};
pub use views::{
    AchievementReport, Badge, DeadlineStatus, FundingSourceBalance, PaymentProgress, StreakState,
    ThresholdAdvice, ThresholdLevel, TreasurySummary, Urgency,
};
