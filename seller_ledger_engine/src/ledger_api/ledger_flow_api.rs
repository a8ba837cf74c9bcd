use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    config::LedgerConfig,
    db_types::{Cents, LedgerEntry, LedgerEntryType, NewLedgerEntry, OrderId},
    events::{EventProducers, SaleRecordedEvent},
    fees::StripeFeeBreakdown,
    ledger_api::ledger_objects::{LedgerQueryFilter, RecordedSale, SaleRecord},
    traits::{LedgerDatabase, LedgerError},
};

/// `LedgerApi` is the primary API for recording money movements against seller stores and reading balances back.
pub struct LedgerApi<B> {
    db: B,
    config: LedgerConfig,
    producers: EventProducers,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi ({:?})", self.config)
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, config: LedgerConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase
{
    /// Appends a single entry to the ledger. Entries without a currency are recorded in the configured currency.
    pub async fn record_entry(&self, mut entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        if entry.currency.is_none() {
            entry.currency = Some(self.config.currency.clone());
        }
        self.db.insert_entry(entry).await
    }

    /// Charges the store a flat listing fee for a product. The fee debits the seller's balance immediately and is
    /// recovered from later sales. If `amount` is `None`, the configured listing fee is charged.
    pub async fn accrue_listing_fee(
        &self,
        store_id: i64,
        product_id: i64,
        amount: Option<Cents>,
    ) -> Result<LedgerEntry, LedgerError> {
        let amount = amount.unwrap_or(self.config.default_listing_fee);
        if !amount.is_positive() {
            return Err(LedgerError::ValidationError(format!("A listing fee must be positive. Got {amount}")));
        }
        let entry = NewLedgerEntry::new(store_id, LedgerEntryType::ListingFeeAccrued, -amount)
            .with_product_id(product_id)
            .with_description(format!("Listing fee for product {product_id}"));
        let entry = self.record_entry(entry).await?;
        debug!("🧾️ Listing fee of {amount} accrued for product {product_id} in store {store_id}");
        Ok(entry)
    }

    /// Records a sale and recovers as much outstanding listing-fee debt as it can, in one atomic step. Returns the fee
    /// breakdown to attach to the payment request.
    pub async fn record_sale(&self, sale: SaleRecord) -> Result<StripeFeeBreakdown, LedgerError> {
        let recorded = self.process_sale(sale).await?;
        Ok(recorded.breakdown)
    }

    /// As [`Self::record_sale`], but returns every entry that was written.
    pub async fn process_sale(&self, mut sale: SaleRecord) -> Result<RecordedSale, LedgerError> {
        if sale.platform_fee_percent.is_none() {
            sale.platform_fee_percent = Some(self.config.platform_fee_percent);
        }
        if sale.currency.is_none() {
            sale.currency = Some(self.config.currency.clone());
        }
        let store_id = sale.store_id;
        let recorded = self.db.record_sale(sale).await?;
        self.call_sale_recorded_hook(store_id, &recorded).await;
        Ok(recorded)
    }

    async fn call_sale_recorded_hook(&self, store_id: i64, recorded: &RecordedSale) {
        if self.producers.sale_recorded_producer.is_empty() {
            return;
        }
        debug!("🧾️ Notifying sale recorded hook subscribers");
        let event = SaleRecordedEvent {
            store_id,
            breakdown: recorded.breakdown,
            entries: recorded.entries.clone(),
            entries_settled: recorded.entries_settled,
        };
        self.producers.publish_sale_recorded(event).await;
    }

    /// Applies recovered cash to the store's oldest listing fees. Returns the number of fees settled.
    pub async fn settle_oldest_listing_fees(
        &self,
        store_id: i64,
        recovered: Cents,
        triggering_order: Option<&OrderId>,
    ) -> Result<usize, LedgerError> {
        self.db.settle_oldest_listing_fees(store_id, recovered, triggering_order).await
    }

    /// All entries for the store, newest first.
    pub async fn entries_for_store(&self, store_id: i64) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.db.fetch_entries(LedgerQueryFilter::for_store(store_id)).await
    }

    /// The store's entries created in `[from, to)`, newest first.
    pub async fn get_ledger_entries(
        &self,
        store_id: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.db.fetch_entries(LedgerQueryFilter::for_store(store_id).in_range(from, to)).await
    }

    pub async fn search_entries(&self, filter: LedgerQueryFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        if filter.store_id.is_none() {
            warn!("🧾️ Ledger search without a store id: {filter}");
        }
        self.db.fetch_entries(filter).await
    }

    pub async fn sum_by_type(
        &self,
        store_id: i64,
        entry_type: LedgerEntryType,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Cents, LedgerError> {
        let filter = LedgerQueryFilter::for_store(store_id).with_entry_type(entry_type).in_range(from, to);
        self.db.sum_entries(filter).await
    }

    /// The net change in the seller's balance over `[from, to)`. Informational entries are excluded.
    pub async fn sum_affecting_balance(
        &self,
        store_id: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Cents, LedgerError> {
        let filter = LedgerQueryFilter::for_store(store_id).affecting_balance().in_range(from, to);
        self.db.sum_entries(filter).await
    }

    /// The seller's current balance.
    pub async fn balance(&self, store_id: i64) -> Result<Cents, LedgerError> {
        self.sum_affecting_balance(store_id, None, None).await
    }

    /// Replays the store's full entry log and checks that it reproduces the balance reported by the database.
    /// Returns the verified balance.
    pub async fn verify_balance(&self, store_id: i64) -> Result<Cents, LedgerError> {
        let (entries, recorded) = self.db.fetch_entries_with_balance(store_id).await?;
        let replayed = entries.iter().map(LedgerEntry::balance_contribution).sum::<Cents>();
        if replayed != recorded {
            error!("🧾️ Balance for store {store_id} is {recorded}, but the ledger replays to {replayed}");
            return Err(LedgerError::BalanceMismatch { store_id, recorded, replayed });
        }
        trace!("🧾️ Balance of {recorded} for store {store_id} verified over {} entries", entries.len());
        Ok(recorded)
    }

    pub async fn count_unsettled(&self, store_id: i64, entry_type: LedgerEntryType) -> Result<i64, LedgerError> {
        self.db.count_unsettled(store_id, entry_type).await
    }

    pub async fn outstanding_listing_fees(&self, store_id: i64) -> Result<Cents, LedgerError> {
        self.db.outstanding_listing_fees(store_id).await
    }
}
