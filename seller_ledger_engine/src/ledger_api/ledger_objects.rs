use std::fmt::Display;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cents, LedgerEntry, LedgerEntryType, OrderId},
    fees::StripeFeeBreakdown,
};

/// Selects ledger entries. Time ranges are half-open: `since` is inclusive and `until` is exclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerQueryFilter {
    pub store_id: Option<i64>,
    pub entry_types: Option<Vec<LedgerEntryType>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub settled: Option<bool>,
    #[serde(default)]
    pub affects_balance_only: bool,
}

impl LedgerQueryFilter {
    pub fn for_store(store_id: i64) -> Self {
        Self { store_id: Some(store_id), ..Default::default() }
    }

    pub fn with_entry_type(mut self, entry_type: LedgerEntryType) -> Self {
        self.entry_types.get_or_insert_with(Vec::new).push(entry_type);
        self
    }

    /// Restricts the filter to `[from, to)`. Either end may be open.
    pub fn in_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.since = from;
        self.until = to;
        self
    }

    pub fn with_settled(mut self, settled: bool) -> Self {
        self.settled = Some(settled);
        self
    }

    pub fn affecting_balance(mut self) -> Self {
        self.affects_balance_only = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.store_id.is_none() &&
            self.entry_types.as_ref().map(|t| t.is_empty()).unwrap_or(true) &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.settled.is_none() &&
            !self.affects_balance_only
    }
}

impl Display for LedgerQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(store_id) = &self.store_id {
            write!(f, "store: {store_id}. ")?;
        }
        if let Some(types) = &self.entry_types {
            let types = types.iter().map(|t| t.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "types: [{types}]. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(settled) = &self.settled {
            write!(f, "settled: {settled}. ")?;
        }
        if self.affects_balance_only {
            write!(f, "balance entries only. ")?;
        }
        Ok(())
    }
}

/// A completed checkout for one seller store, as reported by the checkout flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub store_id: i64,
    pub order_id: Option<OrderId>,
    pub subtotal: Cents,
    #[serde(default)]
    pub shipping: Cents,
    #[serde(default)]
    pub tax: Cents,
    /// Overrides the configured platform fee for this sale
    pub platform_fee_percent: Option<Decimal>,
    /// Overrides the configured currency for this sale
    pub currency: Option<String>,
}

impl SaleRecord {
    pub fn new(store_id: i64, subtotal: Cents) -> Self {
        Self {
            store_id,
            order_id: None,
            subtotal,
            shipping: Cents::ZERO,
            tax: Cents::ZERO,
            platform_fee_percent: None,
            currency: None,
        }
    }

    pub fn with_order_id<O: Into<OrderId>>(mut self, order_id: O) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_shipping(mut self, shipping: Cents) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn with_tax(mut self, tax: Cents) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_platform_fee_percent(mut self, percent: Decimal) -> Self {
        self.platform_fee_percent = Some(percent);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// The revenue the seller sees for this sale, before fees. `None` if the sum does not fit in 64 bits.
    pub fn revenue(&self) -> Option<Cents> {
        self.subtotal.checked_add(self.shipping)
    }
}

/// The result of recording a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSale {
    pub breakdown: StripeFeeBreakdown,
    /// The entries appended for the sale itself, followed by the settlement audit entries
    pub entries: Vec<LedgerEntry>,
    pub entries_settled: usize,
    /// Listing fee cash withheld from the sale that did not cover the next whole debt
    pub unapplied_recovery: Cents,
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn ranges_leave_either_end_open() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(1);
        let filter = LedgerQueryFilter::for_store(5).in_range(Some(from), Some(to));
        assert_eq!(filter.since, Some(from));
        assert_eq!(filter.until, Some(to));
        let open = filter.in_range(None, Some(to));
        assert!(open.since.is_none());
        assert!(!open.is_empty());
        assert!(LedgerQueryFilter::default().in_range(None, None).is_empty());
    }

    #[test]
    fn filter_display() {
        assert_eq!(LedgerQueryFilter::default().to_string(), "No filters.");
        let filter = LedgerQueryFilter::for_store(3)
            .with_entry_type(LedgerEntryType::SaleSubtotal)
            .with_entry_type(LedgerEntryType::Refund)
            .with_settled(false);
        assert_eq!(filter.to_string(), "store: 3. types: [SALE_SUBTOTAL,REFUND]. settled: false. ");
    }

    #[test]
    fn revenue_overflow_is_reported() {
        let sale = SaleRecord::new(1, Cents::from(1000)).with_shipping(Cents::from(500));
        assert_eq!(sale.revenue(), Some(Cents::from(1500)));
        let huge = SaleRecord::new(1, Cents::from(i64::MAX)).with_shipping(Cents::from(1));
        assert_eq!(huge.revenue(), None);
    }
}
