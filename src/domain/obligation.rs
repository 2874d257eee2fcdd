use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

/// Bucket that collected dues and approved expenses reconcile against:
/// either a specific obligation or the unallocated general fund.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FundingSource {
    General,
    Obligation(Uuid),
}

impl FundingSource {
    pub fn from_obligation(id: Option<Uuid>) -> Self {
        match id {
            Some(id) => FundingSource::Obligation(id),
            None => FundingSource::General,
        }
    }

    pub fn obligation_id(&self) -> Option<Uuid> {
        match self {
            FundingSource::General => None,
            FundingSource::Obligation(id) => Some(*id),
        }
    }
}

impl fmt::Display for FundingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundingSource::General => write!(f, "general fund"),
            FundingSource::Obligation(id) => write!(f, "obligation:{id}"),
        }
    }
}

/// A due the class collects against; doubles as a funding source once
/// payments land. Immutable after creation except for activation toggling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentObligation {
    pub id: Uuid,
    pub title: String,
    /// Unit price per student, in the smallest currency unit.
    pub amount: i64,
    pub deadline: Option<DateTime<Utc>>,
    pub allows_partial: bool,
    /// Cohort tags the obligation targets; empty targets everyone.
    #[serde(default)]
    pub target_levels: BTreeSet<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentObligation {
    pub fn new(draft: ObligationDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            amount: draft.amount,
            deadline: draft.deadline,
            allows_partial: draft.allows_partial,
            target_levels: draft.target_levels,
            is_active: true,
            created_at: now,
        }
    }

    /// Whether the obligation applies to a student in `level`.
    pub fn targets_level(&self, level: Option<&str>) -> bool {
        match level {
            None => true,
            Some(level) => self.target_levels.is_empty() || self.target_levels.contains(level),
        }
    }

    pub fn funding_source(&self) -> FundingSource {
        FundingSource::Obligation(self.id)
    }
}

impl Identifiable for PaymentObligation {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for PaymentObligation {
    fn display_label(&self) -> String {
        format!("obligation:{} \"{}\"", self.id, self.title)
    }
}

/// Admin-supplied fields for a new obligation; the store assigns the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObligationDraft {
    pub title: String,
    pub amount: i64,
    pub deadline: Option<DateTime<Utc>>,
    pub allows_partial: bool,
    #[serde(default)]
    pub target_levels: BTreeSet<String>,
}

impl ObligationDraft {
    pub fn new(title: impl Into<String>, amount: i64) -> Self {
        Self {
            title: title.into(),
            amount,
            deadline: None,
            allows_partial: false,
            target_levels: BTreeSet::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_partial(mut self, allowed: bool) -> Self {
        self.allows_partial = allowed;
        self
    }
}
