use mkt_common::MoneyError;
use thiserror::Error;

use crate::{
    db_types::{Cents, LedgerEntry, NewLedgerEntry, OrderId},
    ledger_api::ledger_objects::{RecordedSale, SaleRecord},
    traits::LedgerQueries,
};

/// This trait defines the mutating behaviour of a seller ledger backend.
///
/// Every method runs in its own atomic transaction. Nothing a method writes is visible if it returns an error.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + LedgerQueries {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Validates and appends a single entry to the ledger. The entry's currency must already be resolved.
    async fn insert_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// Records a sale in a single atomic transaction:
    /// * reads the store's outstanding listing-fee debt,
    /// * computes the fee breakdown,
    /// * appends the sale, shipping, platform fee and tax entries,
    /// * settles the oldest listing-fee debts using the recoverable amount from the breakdown.
    async fn record_sale(&self, sale: SaleRecord) -> Result<RecordedSale, LedgerError>;

    /// Applies `recovered` to the oldest unsettled `LISTING_FEE_ACCRUED` entries of the store, oldest first, settling
    /// entries in full only. Returns the number of entries settled.
    ///
    /// A non-positive `recovered` amount returns 0 without touching the database.
    async fn settle_oldest_listing_fees(
        &self,
        store_id: i64,
        recovered: Cents,
        triggering_order: Option<&OrderId>,
    ) -> Result<usize, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("The ledger database reported an error: {0}")]
    DatabaseError(String),
    #[error("Invalid ledger input. {0}")]
    ValidationError(String),
    #[error("Could not resolve the order for this event. {0}")]
    OrderNotFound(String),
    #[error("Could not resolve the store for this event. {0}")]
    StoreNotFound(String),
    #[error("{0}")]
    PrecisionError(#[from] MoneyError),
    #[error("Could not read payment processor event. {0}")]
    InvalidEventPayload(String),
    #[error("Idempotency key {0} has already been issued")]
    IdempotencyKeyCollision(String),
    #[error("Balance for store {store_id} is {recorded} but replaying the ledger gives {replayed}")]
    BalanceMismatch { store_id: i64, recorded: Cents, replayed: Cents },
}

impl LedgerError {
    /// Referential failures that no amount of redelivery will fix. Events failing this way are still marked as
    /// processed.
    pub fn is_unresolvable_reference(&self) -> bool {
        matches!(self, Self::OrderNotFound(_) | Self::StoreNotFound(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
