use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LedgerEntry, Order},
    fees::StripeFeeBreakdown,
};

/// Published after a sale has been committed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecordedEvent {
    pub store_id: i64,
    pub breakdown: StripeFeeBreakdown,
    pub entries: Vec<LedgerEntry>,
    pub entries_settled: usize,
}

/// Published after a payment processor event has changed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    /// The processor event that caused the change
    pub event_id: String,
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderStatusChangedEvent {
    pub fn new<S: Into<String>>(event_id: S, old_order: Order, new_order: Order) -> Self {
        Self { event_id: event_id.into(), old_order, new_order }
    }
}
