//! Pre-approval risk advisory for candidate expenses.

use crate::config::EngineConfig;
use crate::core::services::{BalanceService, ServiceResult};
use crate::domain::obligation::FundingSource;
use crate::domain::views::{ThresholdAdvice, ThresholdLevel};
use crate::errors::EngineError;
use crate::store::RecordStore;

/// Classifies the post-approval balance outcome of a candidate expense.
///
/// Advisory only: the approver sees the classification before committing;
/// the advisor itself never vetoes a transition.
pub struct ThresholdService;

impl ThresholdService {
    pub fn classify(
        store: &dyn RecordStore,
        config: &EngineConfig,
        source: FundingSource,
        candidate_amount: i64,
    ) -> ServiceResult<ThresholdAdvice> {
        if let Some(id) = source.obligation_id() {
            if store.obligation(id)?.is_none() {
                return Err(EngineError::Consistency(format!(
                    "funding source references unknown obligation {id}"
                )));
            }
        }
        let current = BalanceService::compute_unchecked(store, source)?.balance;
        let balance_after = current - candidate_amount;
        let level = if balance_after < 0 {
            ThresholdLevel::Critical
        } else if balance_after < config.low_balance_threshold {
            ThresholdLevel::Warning
        } else {
            ThresholdLevel::Normal
        };
        Ok(ThresholdAdvice {
            source,
            level,
            current_balance: current,
            balance_after,
        })
    }
}
