use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::LedgerError,
};

/// The slice of order management that payment reconciliation depends on.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores the order if it does not exist yet. Returns the stored order and `true` if it was inserted, or the
    /// existing order and `false` otherwise.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), LedgerError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;
}
