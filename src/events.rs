//! Boundary between the engine and its notification/UI collaborators.
//!
//! The engine emits abstract events; delivery (push, sound, toasts) is a
//! collaborator concern. Publishing is infallible from the engine's point of
//! view so a flaky sink can never fail a committed transition.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::obligation::FundingSource;
use crate::domain::views::ThresholdLevel;

/// State-change notifications emitted by the approval flow. Amounts are in
/// the smallest currency unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    PaymentApproved {
        payment_id: Uuid,
        student_id: Uuid,
        obligation_id: Uuid,
        amount: i64,
        waived: bool,
    },
    PaymentRejected {
        payment_id: Uuid,
        student_id: Uuid,
        reason: String,
    },
    ExpenseApproved {
        expense_id: Uuid,
        funded_by: FundingSource,
        amount: i64,
    },
    ExpenseRejected {
        expense_id: Uuid,
        reason: String,
    },
    ThresholdCrossed {
        source: FundingSource,
        level: ThresholdLevel,
        balance_after: i64,
    },
}

/// Abstract sink consumed by notification collaborators.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn publish(&self, event: EngineEvent) {
        (**self).publish(event);
    }
}

/// Discards every event; the default for headless callers.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: EngineEvent) {}
}

/// Buffers events in memory, in publish order. Test double.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<EngineEvent> {
        let mut guard = self.events.lock().unwrap_or_else(|poison| poison.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn snapshot(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_preserves_publish_order() {
        let sink = RecordingSink::new();
        sink.publish(EngineEvent::ExpenseRejected {
            expense_id: Uuid::new_v4(),
            reason: "duplicate".into(),
        });
        sink.publish(EngineEvent::ThresholdCrossed {
            source: FundingSource::General,
            level: ThresholdLevel::Warning,
            balance_after: 12_000,
        });

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::ExpenseRejected { .. }));
        assert!(sink.snapshot().is_empty());
    }
}
