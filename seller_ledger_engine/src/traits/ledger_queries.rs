use crate::{
    db_types::{Cents, LedgerEntry, LedgerEntryType},
    ledger_api::ledger_objects::LedgerQueryFilter,
    traits::LedgerError,
};

/// Read access to the ledger. All queries are scoped by the filter, which should always carry a store id.
#[allow(async_fn_in_trait)]
pub trait LedgerQueries {
    /// Fetches the entries matching the filter, newest first.
    async fn fetch_entries(&self, filter: LedgerQueryFilter) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Sums the `amount` of every entry matching the filter. An empty result sums to zero.
    async fn sum_entries(&self, filter: LedgerQueryFilter) -> Result<Cents, LedgerError>;

    /// Fetches every entry for the store (newest first) together with the store's balance, both read from the same
    /// snapshot of the ledger.
    async fn fetch_entries_with_balance(&self, store_id: i64) -> Result<(Vec<LedgerEntry>, Cents), LedgerError>;

    /// Counts the unsettled entries of the given type for a store.
    async fn count_unsettled(&self, store_id: i64, entry_type: LedgerEntryType) -> Result<i64, LedgerError>;

    /// The total listing-fee debt that has not been recovered yet, as a positive amount.
    async fn outstanding_listing_fees(&self, store_id: i64) -> Result<Cents, LedgerError>;
}
