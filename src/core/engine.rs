//! Facade that wires the record store, event sink, and configuration into
//! the contract surface exposed to UI/API collaborators.

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::services::{
    AchievementService, ApprovalService, BalanceService, DeadlineService, ServiceResult,
    ThresholdService,
};
use crate::domain::common::Displayable;
use crate::domain::expense::{Expense, ExpenseAmendment, ExpenseDraft, ExpensePatch};
use crate::domain::obligation::{FundingSource, ObligationDraft, PaymentObligation};
use crate::domain::payment::{Payment, PaymentDraft};
use crate::domain::views::{
    AchievementReport, DeadlineStatus, FundingSourceBalance, ThresholdAdvice, TreasurySummary,
};
use crate::errors::EngineError;
use crate::events::{EventSink, NullSink};
use crate::store::RecordStore;

/// The Ledger & Approval Engine.
///
/// Stateless between invocations: every derived value is recomputed from the
/// record store on demand, so the engine can never drift from the records it
/// reads. Holds the store and sink behind trait objects; collaborators pick
/// the backends.
pub struct DuesEngine {
    store: Box<dyn RecordStore>,
    events: Box<dyn EventSink>,
    config: EngineConfig,
}

impl DuesEngine {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self {
            store,
            events: Box::new(NullSink),
            config: EngineConfig::default(),
        }
    }

    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- obligations -----------------------------------------------------

    pub fn create_obligation(&self, draft: ObligationDraft) -> ServiceResult<PaymentObligation> {
        if draft.title.trim().is_empty() {
            return Err(EngineError::Validation("obligation title must not be empty".into()));
        }
        if draft.amount <= 0 {
            return Err(EngineError::Validation("obligation amount must be positive".into()));
        }
        let obligation = self.store.insert_obligation(draft, Utc::now())?;
        tracing::info!(obligation = %obligation.display_label(), amount = obligation.amount, "obligation created");
        Ok(obligation)
    }

    pub fn set_obligation_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> ServiceResult<PaymentObligation> {
        self.store.set_obligation_active(id, active)
    }

    // ---- submissions -----------------------------------------------------

    /// Records a pending payment after validating it against its obligation.
    pub fn submit_payment(&self, draft: PaymentDraft) -> ServiceResult<Payment> {
        if draft.amount <= 0 {
            return Err(EngineError::Validation("payment amount must be positive".into()));
        }
        let obligation = self
            .store
            .obligation(draft.obligation_id)?
            .ok_or_else(|| EngineError::NotFound(format!("obligation {}", draft.obligation_id)))?;
        if !obligation.is_active {
            return Err(EngineError::Validation(format!(
                "obligation \"{}\" is not accepting payments",
                obligation.title
            )));
        }
        if !obligation.allows_partial && draft.amount < obligation.amount {
            return Err(EngineError::Validation(format!(
                "obligation \"{}\" does not allow partial payments",
                obligation.title
            )));
        }
        self.store.insert_payment(draft, Utc::now())
    }

    /// Records a pending expense draft.
    pub fn submit_expense(&self, draft: ExpenseDraft) -> ServiceResult<Expense> {
        if draft.title.trim().is_empty() {
            return Err(EngineError::Validation("expense title must not be empty".into()));
        }
        if draft.amount <= 0 {
            return Err(EngineError::Validation("expense amount must be positive".into()));
        }
        if let Some(id) = draft.funded_by.obligation_id() {
            if self.store.obligation(id)?.is_none() {
                return Err(EngineError::NotFound(format!("obligation {id}")));
            }
        }
        self.store.insert_expense(draft, Utc::now())
    }

    // ---- approvals -------------------------------------------------------

    pub fn approve_payment(&self, payment_id: Uuid, waived: bool) -> ServiceResult<Payment> {
        ApprovalService::approve_payment(
            self.store.as_ref(),
            self.events.as_ref(),
            payment_id,
            waived,
            Utc::now(),
        )
    }

    pub fn reject_payment(&self, payment_id: Uuid, reason: &str) -> ServiceResult<Payment> {
        ApprovalService::reject_payment(self.store.as_ref(), self.events.as_ref(), payment_id, reason)
    }

    pub fn approve_expense(
        &self,
        expense_id: Uuid,
        admin_id: Uuid,
        acknowledged_risk: bool,
    ) -> ServiceResult<(Expense, ThresholdAdvice)> {
        ApprovalService::approve_expense(
            self.store.as_ref(),
            self.events.as_ref(),
            &self.config,
            expense_id,
            admin_id,
            acknowledged_risk,
            Utc::now(),
        )
    }

    pub fn reject_expense(&self, expense_id: Uuid, reason: &str) -> ServiceResult<Expense> {
        ApprovalService::reject_expense(self.store.as_ref(), self.events.as_ref(), expense_id, reason)
    }

    pub fn amend_approved_expense(
        &self,
        expense_id: Uuid,
        patch: &ExpensePatch,
        reason: &str,
        performed_by: Uuid,
    ) -> ServiceResult<Expense> {
        ApprovalService::amend_approved_expense(
            self.store.as_ref(),
            expense_id,
            patch,
            reason,
            performed_by,
            Utc::now(),
        )
    }

    pub fn amendments(&self, expense_id: Uuid) -> ServiceResult<Vec<ExpenseAmendment>> {
        self.store.list_amendments(expense_id)
    }

    // ---- derived views ---------------------------------------------------

    pub fn balance(&self, source: FundingSource) -> ServiceResult<FundingSourceBalance> {
        BalanceService::compute(self.store.as_ref(), source)
    }

    pub fn all_balances(&self) -> ServiceResult<Vec<FundingSourceBalance>> {
        BalanceService::compute_all(self.store.as_ref())
    }

    pub fn treasury(&self) -> ServiceResult<TreasurySummary> {
        BalanceService::treasury(self.store.as_ref())
    }

    pub fn classify_threshold(
        &self,
        source: FundingSource,
        candidate_amount: i64,
    ) -> ServiceResult<ThresholdAdvice> {
        ThresholdService::classify(self.store.as_ref(), &self.config, source, candidate_amount)
    }

    pub fn deadlines(
        &self,
        student_id: Uuid,
        level: Option<&str>,
    ) -> ServiceResult<Vec<DeadlineStatus>> {
        DeadlineService::classify(self.store.as_ref(), &self.config, student_id, level, Utc::now())
    }

    pub fn achievements(&self, student_id: Uuid) -> ServiceResult<AchievementReport> {
        AchievementService::evaluate(self.store.as_ref(), &self.config, student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentMethod;
    use crate::store::MemoryStore;

    fn engine() -> DuesEngine {
        DuesEngine::new(Box::new(MemoryStore::new()))
    }

    #[test]
    fn obligation_drafts_are_validated() {
        let engine = engine();
        let err = engine
            .create_obligation(ObligationDraft::new("  ", 1_000))
            .expect_err("blank title");
        assert!(matches!(err, EngineError::Validation(_)));
        let err = engine
            .create_obligation(ObligationDraft::new("Dues", 0))
            .expect_err("zero amount");
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn partial_payment_needs_obligation_consent() {
        let engine = engine();
        let obligation = engine
            .create_obligation(ObligationDraft::new("Dues", 5_000))
            .unwrap();
        let err = engine
            .submit_payment(PaymentDraft::new(
                Uuid::new_v4(),
                obligation.id,
                2_000,
                PaymentMethod::Cash,
            ))
            .expect_err("partial payment against strict obligation");
        assert!(matches!(err, EngineError::Validation(_)));

        let partial = engine
            .create_obligation(ObligationDraft::new("Flexible", 5_000).with_partial(true))
            .unwrap();
        engine
            .submit_payment(PaymentDraft::new(
                Uuid::new_v4(),
                partial.id,
                2_000,
                PaymentMethod::Cash,
            ))
            .expect("partial payment accepted");
    }

    #[test]
    fn inactive_obligation_rejects_submissions() {
        let engine = engine();
        let obligation = engine
            .create_obligation(ObligationDraft::new("Dues", 5_000))
            .unwrap();
        engine.set_obligation_active(obligation.id, false).unwrap();

        let err = engine
            .submit_payment(PaymentDraft::new(
                Uuid::new_v4(),
                obligation.id,
                5_000,
                PaymentMethod::Cash,
            ))
            .expect_err("inactive obligation");
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn expense_against_unknown_obligation_is_not_found() {
        let engine = engine();
        let err = engine
            .submit_expense(ExpenseDraft::new(
                "Decorations",
                1_000,
                FundingSource::Obligation(Uuid::new_v4()),
            ))
            .expect_err("unknown obligation");
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
