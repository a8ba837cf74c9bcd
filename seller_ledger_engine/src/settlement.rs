//! FIFO recovery of listing-fee debt.
//!
//! Recovered cash is applied to a store's unsettled `LISTING_FEE_ACCRUED` entries strictly oldest first. An entry is
//! settled only when the remaining cash covers it in full. The walk stops at the first entry that cannot be covered,
//! even if a later, smaller debt would fit.
use log::trace;

use crate::db_types::{Cents, LedgerEntry, LedgerEntryType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Entries to mark as settled, oldest first
    pub entries: Vec<LedgerEntry>,
    /// The total debt covered by `entries`
    pub applied: Cents,
    /// Recovered cash left over after the walk stopped
    pub unapplied: Cents,
}

impl SettlementPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Plans which debts `recovered` pays off. The candidates may arrive in any order; they are sorted by creation time
/// (ties broken by id) before the walk. Entries that are already settled, or are not listing-fee accruals, are ignored.
pub fn plan_fifo(candidates: &[LedgerEntry], recovered: Cents) -> SettlementPlan {
    if !recovered.is_positive() {
        return SettlementPlan::default();
    }
    let mut debts = candidates
        .iter()
        .filter(|e| e.entry_type == LedgerEntryType::ListingFeeAccrued && !e.is_settled)
        .collect::<Vec<_>>();
    debts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut remaining = recovered;
    let mut entries = Vec::new();
    for entry in debts {
        let debt = entry.debt();
        if debt > remaining {
            trace!("🧮️ Entry #{} ({debt}) cannot be covered by the remaining {remaining}. Stopping.", entry.id);
            break;
        }
        remaining -= debt;
        entries.push(entry.clone());
    }
    SettlementPlan { entries, applied: recovered - remaining, unapplied: remaining }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn accrual(id: i64, minutes: i64, debt: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            store_id: 1,
            entry_type: LedgerEntryType::ListingFeeAccrued,
            amount: Cents::from(-debt),
            currency: "USD".into(),
            affects_seller_balance: true,
            order_id: None,
            order_item_id: None,
            product_id: Some(id * 10),
            description: None,
            is_settled: false,
            settled_at: None,
            settled_order_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    fn ids(plan: &SettlementPlan) -> Vec<i64> {
        plan.entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn oldest_entry_settles_first() {
        let debts = vec![accrual(3, 3, 25), accrual(1, 1, 25), accrual(2, 2, 25)];
        let plan = plan_fifo(&debts, Cents::from(30));
        assert_eq!(ids(&plan), vec![1]);
        assert_eq!(plan.applied, Cents::from(25));
        assert_eq!(plan.unapplied, Cents::from(5));
    }

    #[test]
    fn stops_at_first_uncovered_entry() {
        // The third debt would fit in the remaining cash, but it is behind one that does not
        let debts = vec![accrual(1, 1, 20), accrual(2, 2, 50), accrual(3, 3, 5)];
        let plan = plan_fifo(&debts, Cents::from(40));
        assert_eq!(ids(&plan), vec![1]);
        assert_eq!(plan.unapplied, Cents::from(20));
    }

    #[test]
    fn exact_cover_settles_everything() {
        let debts = vec![accrual(1, 1, 25), accrual(2, 2, 25), accrual(3, 3, 25)];
        let plan = plan_fifo(&debts, Cents::from(75));
        assert_eq!(ids(&plan), vec![1, 2, 3]);
        assert_eq!(plan.unapplied, Cents::ZERO);
    }

    #[test]
    fn ties_on_timestamp_fall_back_to_id() {
        let debts = vec![accrual(7, 0, 10), accrual(4, 0, 10)];
        let plan = plan_fifo(&debts, Cents::from(10));
        assert_eq!(ids(&plan), vec![4]);
    }

    #[test]
    fn settled_entries_are_skipped() {
        let mut first = accrual(1, 1, 25);
        first.is_settled = true;
        let debts = vec![first, accrual(2, 2, 25)];
        let plan = plan_fifo(&debts, Cents::from(25));
        assert_eq!(ids(&plan), vec![2]);
    }

    #[test]
    fn non_positive_recovery_is_a_no_op() {
        let debts = vec![accrual(1, 1, 25)];
        assert!(plan_fifo(&debts, Cents::ZERO).is_empty());
        let plan = plan_fifo(&debts, Cents::from(-100));
        assert!(plan.is_empty());
        assert_eq!(plan.unapplied, Cents::ZERO);
    }
}
