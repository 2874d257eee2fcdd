use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};
use crate::domain::obligation::FundingSource;
use crate::domain::payment::ApprovalStatus;

/// An outflow funded from collected dues (or the general fund).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub title: String,
    /// Smallest currency unit.
    pub amount: i64,
    pub funded_by: FundingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Expense {
    pub fn new(draft: ExpenseDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            amount: draft.amount,
            funded_by: draft.funded_by,
            category_id: draft.category_id,
            status: ApprovalStatus::Pending,
            created_at: now,
            approved_at: None,
            rejection_reason: None,
        }
    }

    /// Snapshot of the amendable fields, for the audit trail.
    pub fn fields(&self) -> ExpenseFields {
        ExpenseFields {
            title: self.title.clone(),
            amount: self.amount,
            funded_by: self.funded_by,
            category_id: self.category_id,
        }
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!("expense:{} \"{}\" [{:?}]", self.id, self.title, self.status)
    }
}

/// Admin-supplied fields for a new expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: i64,
    pub funded_by: FundingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
}

impl ExpenseDraft {
    pub fn new(title: impl Into<String>, amount: i64, funded_by: FundingSource) -> Self {
        Self {
            title: title.into(),
            amount,
            funded_by,
            category_id: None,
        }
    }
}

/// The amendable slice of an expense, captured before and after every
/// audited amendment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpenseFields {
    pub title: String,
    pub amount: i64,
    pub funded_by: FundingSource,
    pub category_id: Option<Uuid>,
}

/// Partial update applied through the audited amendment path. `category_id`
/// is doubly optional so an amendment can clear it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funded_by: Option<FundingSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<Uuid>>,
}

impl ExpensePatch {
    pub fn has_effect(&self) -> bool {
        self.title.is_some()
            || self.amount.is_some()
            || self.funded_by.is_some()
            || self.category_id.is_some()
    }

    /// Applies the patch to `expense` in place.
    pub fn apply_to(&self, expense: &mut Expense) {
        if let Some(title) = &self.title {
            expense.title = title.clone();
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(funded_by) = self.funded_by {
            expense.funded_by = funded_by;
        }
        if let Some(category_id) = self.category_id {
            expense.category_id = category_id;
        }
    }
}

/// Append-only audit record for an expense amendment. Amendments never
/// silently mutate: the original approval and both field snapshots survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseAmendment {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub previous: ExpenseFields,
    pub updated: ExpenseFields,
    pub reason: String,
    pub performed_by: Uuid,
    pub performed_at: DateTime<Utc>,
}
