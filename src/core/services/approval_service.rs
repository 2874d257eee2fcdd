//! Approval state machine for payments and expenses.
//!
//! Both record kinds share one lifecycle: created pending, resolved exactly
//! once into approved or rejected. The commit itself is a compare-and-set in
//! the record store, so a lost race surfaces as `AlreadyResolved` rather
//! than a double transition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::services::{ServiceResult, ThresholdService};
use crate::domain::common::Displayable;
use crate::domain::expense::{Expense, ExpenseAmendment, ExpensePatch};
use crate::domain::payment::Payment;
use crate::domain::views::{ThresholdAdvice, ThresholdLevel};
use crate::errors::EngineError;
use crate::events::{EngineEvent, EventSink};
use crate::store::{ExpenseResolution, PaymentResolution, RecordStore};

pub struct ApprovalService;

impl ApprovalService {
    /// Approves a pending payment. `waived` marks the approval as carrying
    /// zero monetary collection; the obligation still counts as satisfied.
    pub fn approve_payment(
        store: &dyn RecordStore,
        events: &dyn EventSink,
        payment_id: Uuid,
        waived: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<Payment> {
        let payment = store
            .payment(payment_id)?
            .ok_or_else(|| EngineError::NotFound(format!("payment {payment_id}")))?;
        if payment.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "payment {payment_id} is already {:?}",
                payment.status
            )));
        }
        let approved = store.resolve_payment(
            payment_id,
            PaymentResolution::Approve {
                approved_at: now,
                waived,
            },
        )?;
        tracing::info!(payment = %approved.display_label(), waived, amount = approved.amount, "payment approved");
        events.publish(EngineEvent::PaymentApproved {
            payment_id: approved.id,
            student_id: approved.student_id,
            obligation_id: approved.obligation_id,
            amount: approved.amount,
            waived,
        });
        Ok(approved)
    }

    /// Rejects a pending payment. The reason is required and recorded;
    /// rejection is final for this record.
    pub fn reject_payment(
        store: &dyn RecordStore,
        events: &dyn EventSink,
        payment_id: Uuid,
        reason: &str,
    ) -> ServiceResult<Payment> {
        let reason = non_blank(reason, "rejection reason")?;
        let payment = store
            .payment(payment_id)?
            .ok_or_else(|| EngineError::NotFound(format!("payment {payment_id}")))?;
        if payment.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "payment {payment_id} is already {:?}",
                payment.status
            )));
        }
        let rejected = store.resolve_payment(
            payment_id,
            PaymentResolution::Reject {
                reason: reason.clone(),
            },
        )?;
        tracing::info!(payment = %rejected.display_label(), "payment rejected");
        events.publish(EngineEvent::PaymentRejected {
            payment_id: rejected.id,
            student_id: rejected.student_id,
            reason,
        });
        Ok(rejected)
    }

    /// Approves a pending expense after consulting the threshold advisor.
    ///
    /// The advisory never vetoes the transition, but a `Critical` advisory
    /// requires the caller to have obtained explicit confirmation first:
    /// approving with `acknowledged_risk == false` is a validation error.
    /// Warning and critical advisories are published as `ThresholdCrossed`.
    pub fn approve_expense(
        store: &dyn RecordStore,
        events: &dyn EventSink,
        config: &EngineConfig,
        expense_id: Uuid,
        admin_id: Uuid,
        acknowledged_risk: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Expense, ThresholdAdvice)> {
        let expense = store
            .expense(expense_id)?
            .ok_or_else(|| EngineError::NotFound(format!("expense {expense_id}")))?;
        if expense.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "expense {expense_id} is already {:?}",
                expense.status
            )));
        }

        let advice = ThresholdService::classify(store, config, expense.funded_by, expense.amount)?;
        if advice.level == ThresholdLevel::Critical && !acknowledged_risk {
            return Err(EngineError::Validation(format!(
                "approving expense {expense_id} would leave {} at {}; the risk must be acknowledged",
                expense.funded_by, advice.balance_after
            )));
        }
        let approved =
            store.resolve_expense(expense_id, ExpenseResolution::Approve { approved_at: now })?;
        // Events describe committed transitions only; a lost race above
        // must not leave a stray advisory in the stream.
        if advice.level != ThresholdLevel::Normal {
            events.publish(EngineEvent::ThresholdCrossed {
                source: advice.source,
                level: advice.level,
                balance_after: advice.balance_after,
            });
        }
        tracing::info!(
            expense = %approved.display_label(),
            %admin_id,
            amount = approved.amount,
            advisory = ?advice.level,
            "expense approved"
        );
        events.publish(EngineEvent::ExpenseApproved {
            expense_id: approved.id,
            funded_by: approved.funded_by,
            amount: approved.amount,
        });
        Ok((approved, advice))
    }

    /// Rejects a pending expense; same contract as payment rejection.
    pub fn reject_expense(
        store: &dyn RecordStore,
        events: &dyn EventSink,
        expense_id: Uuid,
        reason: &str,
    ) -> ServiceResult<Expense> {
        let reason = non_blank(reason, "rejection reason")?;
        let expense = store
            .expense(expense_id)?
            .ok_or_else(|| EngineError::NotFound(format!("expense {expense_id}")))?;
        if expense.status.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "expense {expense_id} is already {:?}",
                expense.status
            )));
        }
        let rejected = store.resolve_expense(
            expense_id,
            ExpenseResolution::Reject {
                reason: reason.clone(),
            },
        )?;
        tracing::info!(expense = %rejected.display_label(), "expense rejected");
        events.publish(EngineEvent::ExpenseRejected {
            expense_id: rejected.id,
            reason,
        });
        Ok(rejected)
    }

    /// Amends an expense in any status, including after approval. The one
    /// exception to terminal immutability: the mutation is paired with an
    /// append-only audit record carrying both field snapshots and a reason.
    pub fn amend_approved_expense(
        store: &dyn RecordStore,
        expense_id: Uuid,
        patch: &ExpensePatch,
        reason: &str,
        performed_by: Uuid,
        now: DateTime<Utc>,
    ) -> ServiceResult<Expense> {
        let reason = non_blank(reason, "amendment reason")?;
        if !patch.has_effect() {
            return Err(EngineError::Validation(
                "amendment must change at least one field".into(),
            ));
        }
        let (before, after) = store.apply_amendment(expense_id, patch)?;
        store.record_amendment(ExpenseAmendment {
            id: Uuid::new_v4(),
            expense_id,
            previous: before.fields(),
            updated: after.fields(),
            reason,
            performed_by,
            performed_at: now,
        })?;
        tracing::info!(expense = %after.display_label(), %performed_by, "expense amended");
        Ok(after)
    }
}

fn non_blank(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}
