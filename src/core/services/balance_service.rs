//! Read-through balance aggregation per funding source.

use std::collections::BTreeSet;

use crate::core::services::ServiceResult;
use crate::domain::obligation::FundingSource;
use crate::domain::views::{FundingSourceBalance, TreasurySummary};
use crate::errors::EngineError;
use crate::store::{ExpenseFilter, PaymentFilter, RecordStore};

/// Derives funding-source balances from a fresh scan on every call.
///
/// No incremental counters are trusted: waiver flags and audited amendments
/// can change historical contributions, so `collected` and `spent` are
/// always recomputed from the current record set.
pub struct BalanceService;

impl BalanceService {
    /// Balance of one funding source. Unknown obligation ids fail loudly.
    pub fn compute(
        store: &dyn RecordStore,
        source: FundingSource,
    ) -> ServiceResult<FundingSourceBalance> {
        if let Some(id) = source.obligation_id() {
            if store.obligation(id)?.is_none() {
                return Err(EngineError::NotFound(format!("obligation {id}")));
            }
        }
        Self::compute_unchecked(store, source)
    }

    /// Balances for every distinct funding source seen in payments and
    /// expenses. Records referencing a non-existent obligation are logged
    /// and excluded rather than failing the whole view.
    pub fn compute_all(store: &dyn RecordStore) -> ServiceResult<Vec<FundingSourceBalance>> {
        let known: BTreeSet<_> = store
            .list_obligations()?
            .into_iter()
            .map(|obligation| obligation.id)
            .collect();

        let mut sources: BTreeSet<FundingSource> = BTreeSet::new();
        for payment in store.list_payments(&PaymentFilter::default())? {
            if known.contains(&payment.obligation_id) {
                sources.insert(FundingSource::Obligation(payment.obligation_id));
            } else {
                tracing::warn!(
                    payment_id = %payment.id,
                    obligation_id = %payment.obligation_id,
                    "payment references unknown obligation; excluded from balances"
                );
            }
        }
        for expense in store.list_expenses(&ExpenseFilter::default())? {
            match expense.funded_by.obligation_id() {
                Some(id) if !known.contains(&id) => {
                    tracing::warn!(
                        expense_id = %expense.id,
                        obligation_id = %id,
                        "expense funded by unknown obligation; excluded from balances"
                    );
                }
                _ => {
                    sources.insert(expense.funded_by);
                }
            }
        }

        sources
            .into_iter()
            .map(|source| Self::compute_unchecked(store, source))
            .collect()
    }

    /// Global collected/spent/remaining view across the whole class fund.
    pub fn treasury(store: &dyn RecordStore) -> ServiceResult<TreasurySummary> {
        let sources = Self::compute_all(store)?;
        let collected = sources.iter().map(|s| s.collected).sum();
        let spent = sources.iter().map(|s| s.spent).sum();
        Ok(TreasurySummary {
            collected,
            spent,
            remaining: collected - spent,
            sources,
        })
    }

    /// Scan without existence checks; callers vet the source first.
    pub(crate) fn compute_unchecked(
        store: &dyn RecordStore,
        source: FundingSource,
    ) -> ServiceResult<FundingSourceBalance> {
        let collected = match source {
            // Payments always target an obligation; nothing collects into
            // the general fund directly.
            FundingSource::General => 0,
            FundingSource::Obligation(id) => {
                let filter = PaymentFilter {
                    obligation_id: Some(id),
                    ..PaymentFilter::collected()
                };
                store
                    .list_payments(&filter)?
                    .iter()
                    .map(|payment| payment.amount)
                    .sum()
            }
        };
        let spent = store
            .list_expenses(&ExpenseFilter::approved_for(source))?
            .iter()
            .map(|expense| expense.amount)
            .sum();
        Ok(FundingSourceBalance::from_parts(source, collected, spent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expense::ExpenseDraft;
    use crate::domain::obligation::ObligationDraft;
    use crate::domain::payment::{PaymentDraft, PaymentMethod};
    use crate::store::{ExpenseResolution, MemoryStore, PaymentResolution};
    use chrono::Utc;
    use uuid::Uuid;

    fn approved_payment(store: &MemoryStore, obligation: Uuid, amount: i64, waived: bool) {
        let now = Utc::now();
        let payment = store
            .insert_payment(
                PaymentDraft::new(Uuid::new_v4(), obligation, amount, PaymentMethod::Cash),
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

    fn approved_expense(store: &MemoryStore, source: FundingSource, amount: i64) {
        let now = Utc::now();
        let expense = store
            .insert_expense(ExpenseDraft::new("Supplies", amount, source), now)
            .unwrap();
        store
            .resolve_expense(expense.id, ExpenseResolution::Approve { approved_at: now })
            .unwrap();
    }

    #[test]
    fn balance_is_collected_minus_spent() {
        let store = MemoryStore::new();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Field trip", 5_000), Utc::now())
            .unwrap();
        let source = obligation.funding_source();
        approved_payment(&store, obligation.id, 12_000, false);
        approved_payment(&store, obligation.id, 8_000, false);
        approved_expense(&store, source, 5_000);

        let balance = BalanceService::compute(&store, source).unwrap();
        assert_eq!(balance.collected, 20_000);
        assert_eq!(balance.spent, 5_000);
        assert_eq!(balance.balance, 15_000);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let store = MemoryStore::new();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Yearbook", 3_000), Utc::now())
            .unwrap();
        approved_payment(&store, obligation.id, 3_000, false);

        let first = BalanceService::compute(&store, obligation.funding_source()).unwrap();
        let second = BalanceService::compute(&store, obligation.funding_source()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn waived_payment_never_changes_collected() {
        let store = MemoryStore::new();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Party", 5_000), Utc::now())
            .unwrap();
        approved_payment(&store, obligation.id, 5_000, true);

        let balance = BalanceService::compute(&store, obligation.funding_source()).unwrap();
        assert_eq!(balance.collected, 0);
        assert_eq!(balance.balance, 0);
    }

    #[test]
    fn pending_and_rejected_records_do_not_count() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Shirts", 2_000), now)
            .unwrap();
        // Pending payment.
        store
            .insert_payment(
                PaymentDraft::new(Uuid::new_v4(), obligation.id, 2_000, PaymentMethod::Cash),
                now,
            )
            .unwrap();
        // Rejected expense.
        let expense = store
            .insert_expense(
                ExpenseDraft::new("Ink", 500, obligation.funding_source()),
                now,
            )
            .unwrap();
        store
            .resolve_expense(
                expense.id,
                ExpenseResolution::Reject {
                    reason: "wrong fund".into(),
                },
            )
            .unwrap();

        let balance = BalanceService::compute(&store, obligation.funding_source()).unwrap();
        assert_eq!(balance.collected, 0);
        assert_eq!(balance.spent, 0);
    }

    #[test]
    fn compute_rejects_unknown_obligation() {
        let store = MemoryStore::new();
        let err = BalanceService::compute(&store, FundingSource::Obligation(Uuid::new_v4()))
            .expect_err("unknown obligation must fail");
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn compute_all_excludes_orphaned_records() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let obligation = store
            .insert_obligation(ObligationDraft::new("Lab fee", 4_000), now)
            .unwrap();
        approved_payment(&store, obligation.id, 4_000, false);
        // Expense against an obligation that was never created.
        approved_expense(&store, FundingSource::Obligation(Uuid::new_v4()), 9_999);
        approved_expense(&store, FundingSource::General, 1_000);

        let balances = BalanceService::compute_all(&store).unwrap();
        assert_eq!(balances.len(), 2);
        let total_spent: i64 = balances.iter().map(|b| b.spent).sum();
        assert_eq!(total_spent, 1_000);
    }

    #[test]
    fn treasury_folds_all_sources() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let trip = store
            .insert_obligation(ObligationDraft::new("Trip", 5_000), now)
            .unwrap();
        let books = store
            .insert_obligation(ObligationDraft::new("Books", 2_500), now)
            .unwrap();
        approved_payment(&store, trip.id, 10_000, false);
        approved_payment(&store, books.id, 2_500, false);
        approved_expense(&store, trip.funding_source(), 4_000);

        let treasury = BalanceService::treasury(&store).unwrap();
        assert_eq!(treasury.collected, 12_500);
        assert_eq!(treasury.spent, 4_000);
        assert_eq!(treasury.remaining, 8_500);
        assert_eq!(treasury.sources.len(), 2);
    }
}
