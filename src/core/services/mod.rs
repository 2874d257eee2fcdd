pub mod achievement_service;
pub mod approval_service;
pub mod balance_service;
pub mod deadline_service;
pub mod threshold_service;

pub use achievement_service::AchievementService;
pub use approval_service::ApprovalService;
pub use balance_service::BalanceService;
pub use deadline_service::DeadlineService;
pub use threshold_service::ThresholdService;

use crate::errors::EngineError;

pub type ServiceResult<T> = Result<T, EngineError>;
