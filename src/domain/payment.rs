use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

/// Shared lifecycle for payments and expenses: created pending, resolved
/// exactly once into a terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileWallet,
    Other,
}

/// A student's contribution toward an obligation. Multiple records per
/// student and obligation are legal (partial payments).
///
/// Invariant: `waived` implies `status == Approved`; the flag is only ever
/// set by the approval transition and means the obligation was satisfied
/// with zero monetary collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// The student whose obligation this payment satisfies.
    pub student_id: Uuid,
    /// Who submitted the payment; differs from `student_id` for
    /// on-behalf contributions.
    pub paid_by: Uuid,
    pub obligation_id: Uuid,
    /// Smallest currency unit.
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub waived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl Payment {
    pub fn new(draft: PaymentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: draft.student_id,
            paid_by: draft.paid_by.unwrap_or(draft.student_id),
            obligation_id: draft.obligation_id,
            amount: draft.amount,
            method: draft.method,
            status: ApprovalStatus::Pending,
            waived: false,
            note: draft.note,
            created_at: now,
            approved_at: None,
            rejection_reason: None,
        }
    }

    /// An approved payment that actually moved money.
    pub fn counts_toward_collection(&self) -> bool {
        self.status == ApprovalStatus::Approved && !self.waived
    }

    /// Submitted by someone other than the student it covers.
    pub fn is_on_behalf(&self) -> bool {
        self.paid_by != self.student_id
    }
}

impl Identifiable for Payment {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Payment {
    fn display_label(&self) -> String {
        format!("payment:{} [{:?}]", self.id, self.status)
    }
}

/// Caller-supplied fields for a new payment; the store assigns id,
/// timestamps, and the pending status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub student_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<Uuid>,
    pub obligation_id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PaymentDraft {
    pub fn new(student_id: Uuid, obligation_id: Uuid, amount: i64, method: PaymentMethod) -> Self {
        Self {
            student_id,
            paid_by: None,
            obligation_id,
            amount,
            method,
            note: None,
        }
    }

    pub fn on_behalf_of(mut self, payer: Uuid) -> Self {
        self.paid_by = Some(payer);
        self
    }
}
