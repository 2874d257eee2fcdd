use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::expense::{Expense, ExpenseAmendment, ExpenseDraft, ExpensePatch};
use crate::domain::obligation::{ObligationDraft, PaymentObligation};
use crate::domain::payment::{ApprovalStatus, Payment, PaymentDraft};
use crate::errors::{EngineError, EngineResult};
use crate::store::json_backend::RecordBook;
use crate::store::{
    ExpenseFilter, ExpenseResolution, PaymentFilter, PaymentResolution, RecordStore,
};

#[derive(Debug, Default, Clone)]
struct Collections {
    obligations: Vec<PaymentObligation>,
    payments: Vec<Payment>,
    expenses: Vec<Expense>,
    amendments: Vec<ExpenseAmendment>,
}

/// In-memory record store. Status transitions compare-and-set inside the
/// write lock, so two racing approvals on one record yield exactly one
/// winner.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrates a store from a persisted snapshot.
    pub fn from_book(book: RecordBook) -> Self {
        Self {
            inner: RwLock::new(Collections {
                obligations: book.obligations,
                payments: book.payments,
                expenses: book.expenses,
                amendments: book.amendments,
            }),
        }
    }

    /// Snapshot of the full record set, for persistence backends.
    pub fn snapshot(&self) -> RecordBook {
        let inner = self.read();
        RecordBook {
            schema_version: crate::store::CURRENT_SCHEMA_VERSION,
            obligations: inner.obligations.clone(),
            payments: inner.payments.clone(),
            expenses: inner.expenses.clone(),
            amendments: inner.amendments.clone(),
        }
    }

    /// Upserts a fully-formed record, bypassing draft construction. Used by
    /// persistence backends and by tests seeding historical state.
    pub fn put_payment(&self, payment: Payment) {
        let mut inner = self.write();
        match inner.payments.iter_mut().find(|p| p.id == payment.id) {
            Some(slot) => *slot = payment,
            None => inner.payments.push(payment),
        }
    }

    pub fn put_expense(&self, expense: Expense) {
        let mut inner = self.write();
        match inner.expenses.iter_mut().find(|e| e.id == expense.id) {
            Some(slot) => *slot = expense,
            None => inner.expenses.push(expense),
        }
    }

    pub fn put_obligation(&self, obligation: PaymentObligation) {
        let mut inner = self.write();
        match inner.obligations.iter_mut().find(|o| o.id == obligation.id) {
            Some(slot) => *slot = obligation,
            None => inner.obligations.push(obligation),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Collections> {
        self.inner.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Collections> {
        self.inner.write().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn insert_obligation(
        &self,
        draft: ObligationDraft,
        now: DateTime<Utc>,
    ) -> EngineResult<PaymentObligation> {
        let obligation = PaymentObligation::new(draft, now);
        self.write().obligations.push(obligation.clone());
        Ok(obligation)
    }

    fn obligation(&self, id: Uuid) -> EngineResult<Option<PaymentObligation>> {
        Ok(self.read().obligations.iter().find(|o| o.id == id).cloned())
    }

    fn list_obligations(&self) -> EngineResult<Vec<PaymentObligation>> {
        Ok(self.read().obligations.clone())
    }

    fn set_obligation_active(&self, id: Uuid, active: bool) -> EngineResult<PaymentObligation> {
        let mut inner = self.write();
        let obligation = inner
            .obligations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("obligation {id}")))?;
        obligation.is_active = active;
        Ok(obligation.clone())
    }

    fn insert_payment(&self, draft: PaymentDraft, now: DateTime<Utc>) -> EngineResult<Payment> {
        let payment = Payment::new(draft, now);
        self.write().payments.push(payment.clone());
        Ok(payment)
    }

    fn payment(&self, id: Uuid) -> EngineResult<Option<Payment>> {
        Ok(self.read().payments.iter().find(|p| p.id == id).cloned())
    }

    fn list_payments(&self, filter: &PaymentFilter) -> EngineResult<Vec<Payment>> {
        let mut matches: Vec<Payment> = self
            .read()
            .payments
            .iter()
            .filter(|payment| filter.matches(payment))
            .cloned()
            .collect();
        matches.sort_by_key(|payment| payment.created_at);
        Ok(matches)
    }

    fn resolve_payment(&self, id: Uuid, resolution: PaymentResolution) -> EngineResult<Payment> {
        let mut inner = self.write();
        let payment = inner
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
        if payment.status != ApprovalStatus::Pending {
            return Err(EngineError::AlreadyResolved(format!(
                "payment {id} is already {:?}",
                payment.status
            )));
        }
        match resolution {
            PaymentResolution::Approve { approved_at, waived } => {
                payment.status = ApprovalStatus::Approved;
                payment.approved_at = Some(approved_at);
                payment.waived = waived;
            }
            PaymentResolution::Reject { reason } => {
                payment.status = ApprovalStatus::Rejected;
                payment.rejection_reason = Some(reason);
            }
        }
        Ok(payment.clone())
    }

    fn insert_expense(&self, draft: ExpenseDraft, now: DateTime<Utc>) -> EngineResult<Expense> {
        let expense = Expense::new(draft, now);
        self.write().expenses.push(expense.clone());
        Ok(expense)
    }

    fn expense(&self, id: Uuid) -> EngineResult<Option<Expense>> {
        Ok(self.read().expenses.iter().find(|e| e.id == id).cloned())
    }

    fn list_expenses(&self, filter: &ExpenseFilter) -> EngineResult<Vec<Expense>> {
        let mut matches: Vec<Expense> = self
            .read()
            .expenses
            .iter()
            .filter(|expense| filter.matches(expense))
            .cloned()
            .collect();
        matches.sort_by_key(|expense| expense.created_at);
        Ok(matches)
    }

    fn resolve_expense(&self, id: Uuid, resolution: ExpenseResolution) -> EngineResult<Expense> {
        let mut inner = self.write();
        let expense = inner
            .expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("expense {id}")))?;
        if expense.status != ApprovalStatus::Pending {
            return Err(EngineError::AlreadyResolved(format!(
                "expense {id} is already {:?}",
                expense.status
            )));
        }
        match resolution {
            ExpenseResolution::Approve { approved_at } => {
                expense.status = ApprovalStatus::Approved;
                expense.approved_at = Some(approved_at);
            }
            ExpenseResolution::Reject { reason } => {
                expense.status = ApprovalStatus::Rejected;
                expense.rejection_reason = Some(reason);
            }
        }
        Ok(expense.clone())
    }

    fn apply_amendment(&self, id: Uuid, patch: &ExpensePatch) -> EngineResult<(Expense, Expense)> {
        let mut inner = self.write();
        let expense = inner
            .expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("expense {id}")))?;
        let before = expense.clone();
        patch.apply_to(expense);
        Ok((before, expense.clone()))
    }

    fn record_amendment(&self, amendment: ExpenseAmendment) -> EngineResult<()> {
        self.write().amendments.push(amendment);
        Ok(())
    }

    fn list_amendments(&self, expense_id: Uuid) -> EngineResult<Vec<ExpenseAmendment>> {
        Ok(self
            .read()
            .amendments
            .iter()
            .filter(|a| a.expense_id == expense_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::obligation::FundingSource;
    use crate::domain::payment::PaymentMethod;

    #[test]
    fn resolve_payment_is_single_shot() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Trip", 5_000), now)
            .unwrap();
        let payment = store
            .insert_payment(
                PaymentDraft::new(Uuid::new_v4(), obligation.id, 5_000, PaymentMethod::Cash),
                now,
            )
            .unwrap();

        store
            .resolve_payment(
                payment.id,
                PaymentResolution::Approve {
                    approved_at: now,
                    waived: false,
                },
            )
            .expect("first resolution wins");
        let err = store
            .resolve_payment(
                payment.id,
                PaymentResolution::Reject {
                    reason: "late".into(),
                },
            )
            .expect_err("second resolution must lose");
        assert!(matches!(err, EngineError::AlreadyResolved(_)));
    }

    #[test]
    fn list_payments_sorts_by_submission_time() {
        let store = MemoryStore::new();
        let obligation_id = Uuid::new_v4();
        let student = Uuid::new_v4();
        let base = Utc::now();
        for offset in [3_i64, 1, 2] {
            store
                .insert_payment(
                    PaymentDraft::new(student, obligation_id, 100, PaymentMethod::Cash),
                    base + chrono::Duration::days(offset),
                )
                .unwrap();
        }
        let listed = store.list_payments(&PaymentFilter::default()).unwrap();
        let times: Vec<_> = listed.iter().map(|p| p.created_at).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn amendment_returns_before_and_after() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let expense = store
            .insert_expense(
                ExpenseDraft::new("Banner", 4_000, FundingSource::General),
                now,
            )
            .unwrap();
        let patch = ExpensePatch {
            amount: Some(4_500),
            ..ExpensePatch::default()
        };
        let (before, after) = store.apply_amendment(expense.id, &patch).unwrap();
        assert_eq!(before.amount, 4_000);
        assert_eq!(after.amount, 4_500);
    }
}
