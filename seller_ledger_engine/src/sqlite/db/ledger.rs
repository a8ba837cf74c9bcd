use chrono::{DateTime, Utc};
use log::*;
use mkt_common::DEFAULT_CURRENCY_CODE;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{Cents, LedgerEntry, LedgerEntryType, NewLedgerEntry, OrderId},
    ledger_api::ledger_objects::LedgerQueryFilter,
    settlement::plan_fifo,
    traits::LedgerError,
};

/// The result of applying recovered cash to a store's listing-fee debt.
#[derive(Debug, Clone, Default)]
pub struct AppliedSettlement {
    /// The number of accrual entries that were marked as settled
    pub settled: usize,
    /// The informational `LISTING_FEE_SETTLED` entries written for each settled accrual
    pub audit_entries: Vec<LedgerEntry>,
    pub unapplied: Cents,
}

/// Appends an entry to the ledger. Entries without a currency are stored in [`DEFAULT_CURRENCY_CODE`].
///
/// This is not atomic. Embed the call in a transaction and pass `&mut tx` as the connection argument if it is one of
/// several writes.
pub async fn insert_entry(entry: NewLedgerEntry, conn: &mut SqliteConnection) -> Result<LedgerEntry, sqlx::Error> {
    let entry: LedgerEntry = sqlx::query_as(
        r#"
            INSERT INTO ledger_entries (
                store_id,
                entry_type,
                amount,
                currency,
                affects_seller_balance,
                order_id,
                order_item_id,
                product_id,
                description,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(entry.store_id)
    .bind(entry.entry_type)
    .bind(entry.amount)
    .bind(entry.currency.unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string()))
    .bind(entry.affects_seller_balance)
    .bind(entry.order_id)
    .bind(entry.order_item_id)
    .bind(entry.product_id)
    .bind(entry.description)
    .bind(entry.created_at)
    .fetch_one(conn)
    .await?;
    trace!("🧾️ Ledger entry #{} ({} {}) added for store {}", entry.id, entry.entry_type, entry.amount, entry.store_id);
    Ok(entry)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: LedgerQueryFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(store_id) = filter.store_id {
        where_clause.push("store_id = ");
        where_clause.push_bind_unseparated(store_id);
    }
    if let Some(types) = filter.entry_types.filter(|t| !t.is_empty()) {
        let types = types.iter().map(|t| format!("'{t}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("entry_type IN ({types})"));
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at < ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(settled) = filter.settled {
        where_clause.push("is_settled = ");
        where_clause.push_bind_unseparated(settled);
    }
    if filter.affects_balance_only {
        where_clause.push("affects_seller_balance = 1");
    }
}

/// Fetches the ledger entries matching the filter, newest first.
pub async fn fetch_entries(
    filter: LedgerQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM ledger_entries");
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC, id DESC");
    trace!("🧾️ Executing query: {}", builder.sql());
    let entries = builder.build_query_as::<LedgerEntry>().fetch_all(conn).await?;
    trace!("🧾️ Result of fetch_entries: {}", entries.len());
    Ok(entries)
}

/// Sums the amounts of the entries matching the filter. Returns zero when nothing matches.
pub async fn sum_entries(filter: LedgerQueryFilter, conn: &mut SqliteConnection) -> Result<Cents, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COALESCE(SUM(amount), 0) FROM ledger_entries");
    push_filter(&mut builder, filter);
    trace!("🧾️ Executing query: {}", builder.sql());
    let total: i64 = builder.build_query_scalar().fetch_one(conn).await?;
    Ok(Cents::from(total))
}

pub async fn count_unsettled(
    store_id: i64,
    entry_type: LedgerEntryType,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ledger_entries WHERE store_id = $1 AND entry_type = $2 AND is_settled = 0",
    )
    .bind(store_id)
    .bind(entry_type)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// The unrecovered listing-fee debt for the store, as a positive amount.
pub async fn outstanding_listing_fees(store_id: i64, conn: &mut SqliteConnection) -> Result<Cents, sqlx::Error> {
    let debt: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(-SUM(amount), 0) FROM ledger_entries
        WHERE store_id = $1 AND entry_type = 'LISTING_FEE_ACCRUED' AND is_settled = 0
        "#,
    )
    .bind(store_id)
    .fetch_one(conn)
    .await?;
    Ok(Cents::from(debt))
}

/// The total refunded so far against an order, as a positive amount.
pub async fn refunded_for_order(
    store_id: i64,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Cents, sqlx::Error> {
    let refunded: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(-SUM(amount), 0) FROM ledger_entries
        WHERE store_id = $1 AND order_id = $2 AND entry_type = 'REFUND'
        "#,
    )
    .bind(store_id)
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(Cents::from(refunded))
}

/// Fetches the unsettled listing-fee accruals for the store, oldest first.
pub async fn fetch_unsettled_listing_fees(
    store_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<LedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        r#"
        SELECT * FROM ledger_entries
        WHERE store_id = $1 AND entry_type = 'LISTING_FEE_ACCRUED' AND is_settled = 0
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(store_id)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// Marks a listing-fee accrual as settled. Returns `false` if the entry was not an unsettled accrual, e.g. because a
/// concurrent settlement got to it first.
pub async fn mark_settled(
    id: i64,
    settled_at: DateTime<Utc>,
    settled_order_id: Option<&OrderId>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE ledger_entries SET is_settled = 1, settled_at = $1, settled_order_id = $2
        WHERE id = $3 AND is_settled = 0 AND entry_type = 'LISTING_FEE_ACCRUED'
        "#,
    )
    .bind(settled_at)
    .bind(settled_order_id.map(|o| o.as_str()))
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Applies `recovered` to the store's oldest listing-fee debts and writes an audit entry for each debt settled.
///
/// This is not atomic. The caller is expected to run it inside a transaction.
pub async fn settle_oldest_listing_fees(
    store_id: i64,
    recovered: Cents,
    triggering_order: Option<&OrderId>,
    conn: &mut SqliteConnection,
) -> Result<AppliedSettlement, LedgerError> {
    if !recovered.is_positive() {
        trace!("🧾️ Nothing to settle for store {store_id}. Recovered amount is {recovered}");
        return Ok(AppliedSettlement::default());
    }
    let candidates = fetch_unsettled_listing_fees(store_id, &mut *conn).await?;
    let plan = plan_fifo(&candidates, recovered);
    let now = Utc::now();
    let mut applied = AppliedSettlement { unapplied: recovered, ..Default::default() };
    for accrual in plan.entries {
        if !mark_settled(accrual.id, now, triggering_order, &mut *conn).await? {
            warn!("🧾️ Listing fee #{} for store {store_id} was settled by someone else. Skipping it.", accrual.id);
            continue;
        }
        let debt = accrual.debt();
        let mut audit = NewLedgerEntry::new(store_id, LedgerEntryType::ListingFeeSettled, debt)
            .with_currency(accrual.currency.clone())
            .with_description(format!("Recovered listing fee #{}", accrual.id))
            .with_created_at(now)
            .informational();
        if let Some(product_id) = accrual.product_id {
            audit = audit.with_product_id(product_id);
        }
        if let Some(order_id) = triggering_order {
            audit = audit.with_order_id(order_id.clone());
        }
        let audit = insert_entry(audit, &mut *conn).await?;
        applied.audit_entries.push(audit);
        applied.settled += 1;
        applied.unapplied -= debt;
    }
    debug!(
        "🧾️ Settled {} listing fees for store {store_id} from {recovered}. {} unapplied.",
        applied.settled, applied.unapplied
    );
    Ok(applied)
}
