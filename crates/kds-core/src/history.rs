//! Journal of applied status changes

use crate::state_machine::OrderStatus;
use crate::types::OrderRecordId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One applied status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub order: OrderRecordId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub at: DateTime<Utc>,
}

/// Append-only, in-memory journal of status changes confirmed by the API.
#[derive(Debug, Default)]
pub struct TransitionJournal {
    inner: Mutex<Vec<TransitionRecord>>,
}

impl TransitionJournal {
    pub fn record(&self, record: TransitionRecord) {
        self.inner.lock().push(record);
    }

    pub fn records(&self) -> Vec<TransitionRecord> {
        self.inner.lock().clone()
    }

    /// Records for one order, oldest first.
    pub fn for_order(&self, id: &OrderRecordId) -> Vec<TransitionRecord> {
        self.inner
            .lock()
            .iter()
            .filter(|r| &r.order == id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
