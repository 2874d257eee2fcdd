//! Record Store contract: append-only payment/expense collections with
//! compare-and-set status transitions.
//!
//! The engine depends on this read/write surface only; the backing
//! persistence engine is a collaborator concern.

pub mod json_backend;
pub mod memory;

pub use json_backend::{JsonStore, RecordBook, CURRENT_SCHEMA_VERSION};
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::expense::{Expense, ExpenseAmendment, ExpenseDraft, ExpensePatch};
use crate::domain::obligation::{FundingSource, ObligationDraft, PaymentObligation};
use crate::domain::payment::{ApprovalStatus, Payment, PaymentDraft};
use crate::errors::EngineResult;

/// Predicate set for payment scans; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub student_id: Option<Uuid>,
    pub paid_by: Option<Uuid>,
    pub obligation_id: Option<Uuid>,
    pub status: Option<ApprovalStatus>,
    pub waived: Option<bool>,
}

impl PaymentFilter {
    /// Approved, non-waived payments: the records that move money.
    pub fn collected() -> Self {
        Self {
            status: Some(ApprovalStatus::Approved),
            waived: Some(false),
            ..Self::default()
        }
    }

    pub fn for_student(student_id: Uuid) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.student_id.is_none_or(|id| payment.student_id == id)
            && self.paid_by.is_none_or(|id| payment.paid_by == id)
            && self.obligation_id.is_none_or(|id| payment.obligation_id == id)
            && self.status.is_none_or(|status| payment.status == status)
            && self.waived.is_none_or(|waived| payment.waived == waived)
    }
}

/// Predicate set for expense scans.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub funded_by: Option<FundingSource>,
    pub status: Option<ApprovalStatus>,
}

impl ExpenseFilter {
    pub fn approved_for(source: FundingSource) -> Self {
        Self {
            funded_by: Some(source),
            status: Some(ApprovalStatus::Approved),
        }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        self.funded_by.is_none_or(|source| expense.funded_by == source)
            && self.status.is_none_or(|status| expense.status == status)
    }
}

/// Terminal outcome committed by a payment compare-and-set.
#[derive(Debug, Clone)]
pub enum PaymentResolution {
    Approve {
        approved_at: DateTime<Utc>,
        waived: bool,
    },
    Reject {
        reason: String,
    },
}

/// Terminal outcome committed by an expense compare-and-set.
#[derive(Debug, Clone)]
pub enum ExpenseResolution {
    Approve { approved_at: DateTime<Utc> },
    Reject { reason: String },
}

/// Read/write contract the engine consumes.
///
/// `resolve_*` methods are compare-and-set transitions: the outcome commits
/// only if the record is still pending at commit time; a lost race fails
/// with `EngineError::AlreadyResolved`. Inserts take `now` from the caller
/// so derived-view computations stay deterministic under test.
pub trait RecordStore: Send + Sync {
    fn insert_obligation(
        &self,
        draft: ObligationDraft,
        now: DateTime<Utc>,
    ) -> EngineResult<PaymentObligation>;
    fn obligation(&self, id: Uuid) -> EngineResult<Option<PaymentObligation>>;
    fn list_obligations(&self) -> EngineResult<Vec<PaymentObligation>>;
    fn set_obligation_active(&self, id: Uuid, active: bool) -> EngineResult<PaymentObligation>;

    fn insert_payment(&self, draft: PaymentDraft, now: DateTime<Utc>) -> EngineResult<Payment>;
    fn payment(&self, id: Uuid) -> EngineResult<Option<Payment>>;
    /// Matching payments in ascending submission order.
    fn list_payments(&self, filter: &PaymentFilter) -> EngineResult<Vec<Payment>>;
    fn resolve_payment(&self, id: Uuid, resolution: PaymentResolution) -> EngineResult<Payment>;

    fn insert_expense(&self, draft: ExpenseDraft, now: DateTime<Utc>) -> EngineResult<Expense>;
    fn expense(&self, id: Uuid) -> EngineResult<Option<Expense>>;
    fn list_expenses(&self, filter: &ExpenseFilter) -> EngineResult<Vec<Expense>>;
    fn resolve_expense(&self, id: Uuid, resolution: ExpenseResolution) -> EngineResult<Expense>;

    /// Mutates the expense in place and returns (before, after) snapshots.
    /// Callers pair this with `record_amendment`; the store never amends
    /// silently on its own.
    fn apply_amendment(&self, id: Uuid, patch: &ExpensePatch) -> EngineResult<(Expense, Expense)>;
    fn record_amendment(&self, amendment: ExpenseAmendment) -> EngineResult<()>;
    /// Audit trail for one expense, oldest first.
    fn list_amendments(&self, expense_id: Uuid) -> EngineResult<Vec<ExpenseAmendment>>;
}
