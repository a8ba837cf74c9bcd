//! `SqliteDatabase` is a concrete implementation of a seller ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use mkt_common::DEFAULT_CURRENCY_CODE;
use sqlx::{migrate::MigrateError, SqliteConnection, SqlitePool};

use super::db::{db_url, idempotency, ledger, new_pool, orders, webhooks, WriteTransaction};
use crate::{
    config::DEFAULT_PLATFORM_FEE_PERCENT,
    db_types::{
        Cents,
        IdempotencyKey,
        LedgerEntry,
        LedgerEntryType,
        NewLedgerEntry,
        NewOrder,
        Order,
        OrderId,
        OrderStatusType,
        WebhookEvent,
    },
    fees,
    ledger_api::{
        ledger_objects::{LedgerQueryFilter, RecordedSale, SaleRecord},
        webhook_objects::{OrderChanged, PaymentEventAction, WebhookOutcome},
    },
    traits::{
        IdempotencyManagement,
        LedgerDatabase,
        LedgerError,
        LedgerQueries,
        OrderManagement,
        WebhookManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        entry.validate()?;
        let mut conn = self.pool.acquire().await?;
        let entry = ledger::insert_entry(entry, &mut conn).await?;
        debug!("🗃️ {} entry #{} of {} recorded for store {}", entry.entry_type, entry.id, entry.amount, entry.store_id);
        Ok(entry)
    }

    async fn record_sale(&self, sale: SaleRecord) -> Result<RecordedSale, LedgerError> {
        let revenue = validate_sale(&sale)?;
        let SaleRecord { store_id, order_id, subtotal, shipping, tax, platform_fee_percent, currency } = sale;
        let percent = platform_fee_percent.unwrap_or(DEFAULT_PLATFORM_FEE_PERCENT);
        let currency = currency.unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let now = Utc::now();
        let new_entry = |entry_type, amount: Cents| {
            let entry = NewLedgerEntry::new(store_id, entry_type, amount)
                .with_currency(currency.clone())
                .with_created_at(now);
            match &order_id {
                Some(oid) => entry.with_order_id(oid.clone()),
                None => entry,
            }
        };
        let mut new_entries = Vec::with_capacity(4);
        if subtotal.is_positive() {
            new_entries.push(new_entry(LedgerEntryType::SaleSubtotal, subtotal));
        }
        if shipping.is_positive() {
            new_entries.push(new_entry(LedgerEntryType::ShippingCollected, shipping));
        }

        let mut tx = WriteTransaction::begin_immediate(&self.pool).await?;
        let outstanding = ledger::outstanding_listing_fees(store_id, &mut tx).await?;
        let breakdown = fees::calculate(subtotal, shipping, percent, outstanding)?;
        trace!("🗃️ Fee breakdown for sale on store {store_id}: {breakdown:?}. Outstanding listing fees: {outstanding}");
        if breakdown.platform_fee_cents.is_positive() {
            new_entries.push(new_entry(LedgerEntryType::PlatformFee, -breakdown.platform_fee_cents));
        }
        if tax.is_positive() {
            new_entries.push(new_entry(LedgerEntryType::TaxCollected, tax));
        }
        let mut entries = Vec::with_capacity(new_entries.len());
        for entry in new_entries {
            entry.validate()?;
            entries.push(ledger::insert_entry(entry, &mut tx).await?);
        }
        let settlement = ledger::settle_oldest_listing_fees(
            store_id,
            breakdown.listing_fee_applied_cents,
            order_id.as_ref(),
            &mut tx,
        )
        .await?;
        entries.extend(settlement.audit_entries);
        if settlement.unapplied.is_positive() {
            let note = new_entry(LedgerEntryType::Adjustment, settlement.unapplied)
                .with_description("Listing fee recovery withheld without settling a whole listing fee")
                .informational();
            note.validate()?;
            entries.push(ledger::insert_entry(note, &mut tx).await?);
            warn!(
                "🗃️ {} of the listing fee withheld from the sale for store {store_id} did not cover the next whole \
                 listing fee and was not applied.",
                settlement.unapplied
            );
        }
        tx.commit().await?;
        info!(
            "🗃️ Sale of {revenue} recorded for store {store_id}. Application fee: {}. {} listing fees settled.",
            breakdown.application_fee_cents, settlement.settled
        );
        Ok(RecordedSale {
            breakdown,
            entries,
            entries_settled: settlement.settled,
            unapplied_recovery: settlement.unapplied,
        })
    }

    async fn settle_oldest_listing_fees(
        &self,
        store_id: i64,
        recovered: Cents,
        triggering_order: Option<&OrderId>,
    ) -> Result<usize, LedgerError> {
        if !recovered.is_positive() {
            return Ok(0);
        }
        let mut tx = WriteTransaction::begin_immediate(&self.pool).await?;
        let settlement = ledger::settle_oldest_listing_fees(store_id, recovered, triggering_order, &mut tx).await?;
        tx.commit().await?;
        if settlement.unapplied.is_positive() {
            warn!("🗃️ {} of the {recovered} recovered for store {store_id} was not applied.", settlement.unapplied);
        }
        Ok(settlement.settled)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Checks the sale amounts and returns the seller-facing revenue.
fn validate_sale(sale: &SaleRecord) -> Result<Cents, LedgerError> {
    if sale.store_id <= 0 {
        return Err(LedgerError::ValidationError(format!("A sale requires a store id. Got {}", sale.store_id)));
    }
    if sale.subtotal.is_negative() || sale.shipping.is_negative() || sale.tax.is_negative() {
        return Err(LedgerError::ValidationError(format!(
            "Sale amounts cannot be negative. Subtotal: {}, shipping: {}, tax: {}",
            sale.subtotal, sale.shipping, sale.tax
        )));
    }
    let revenue = sale.revenue().ok_or_else(|| {
        LedgerError::ValidationError(format!(
            "Sale amounts for store {} are too large. Subtotal: {}, shipping: {}",
            sale.store_id, sale.subtotal, sale.shipping
        ))
    })?;
    if !revenue.is_positive() {
        return Err(LedgerError::ValidationError(format!("Sale for store {} has no revenue", sale.store_id)));
    }
    Ok(revenue)
}

impl LedgerQueries for SqliteDatabase {
    async fn fetch_entries(&self, filter: LedgerQueryFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let entries = ledger::fetch_entries(filter, &mut conn).await?;
        Ok(entries)
    }

    async fn sum_entries(&self, filter: LedgerQueryFilter) -> Result<Cents, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let total = ledger::sum_entries(filter, &mut conn).await?;
        Ok(total)
    }

    async fn fetch_entries_with_balance(&self, store_id: i64) -> Result<(Vec<LedgerEntry>, Cents), LedgerError> {
        // Both reads share one snapshot, so a sale committed in between cannot make them disagree.
        let mut tx = self.pool.begin().await?;
        let entries = ledger::fetch_entries(LedgerQueryFilter::for_store(store_id), &mut tx).await?;
        let balance = ledger::sum_entries(LedgerQueryFilter::for_store(store_id).affecting_balance(), &mut tx).await?;
        tx.commit().await?;
        Ok((entries, balance))
    }

    async fn count_unsettled(&self, store_id: i64, entry_type: LedgerEntryType) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let count = ledger::count_unsettled(store_id, entry_type, &mut conn).await?;
        Ok(count)
    }

    async fn outstanding_listing_fees(&self, store_id: i64) -> Result<Cents, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let debt = ledger::outstanding_listing_fees(store_id, &mut conn).await?;
        Ok(debt)
    }
}

impl IdempotencyManagement for SqliteDatabase {
    async fn store_idempotency_key(
        &self,
        key: &str,
        operation_type: &str,
        resource_id: &str,
    ) -> Result<IdempotencyKey, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let stored = idempotency::insert_key(key, operation_type, resource_id, &mut conn).await?;
        debug!("🗃️ Idempotency key {key} stored for {operation_type} on {resource_id}");
        Ok(stored)
    }

    async fn fetch_latest_idempotency_key(
        &self,
        operation_type: &str,
        resource_id: &str,
    ) -> Result<Option<IdempotencyKey>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let key = idempotency::fetch_latest_key(operation_type, resource_id, &mut conn).await?;
        Ok(key)
    }

    async fn fetch_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyKey>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let key = idempotency::fetch_key(key, &mut conn).await?;
        Ok(key)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), LedgerError> {
        if order.total_price.is_negative() {
            return Err(LedgerError::ValidationError(format!("Order {} has a negative total", order.order_id)));
        }
        let mut tx = WriteTransaction::begin_immediate(&self.pool).await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }
}

impl WebhookManagement for SqliteDatabase {
    async fn reconcile_event(
        &self,
        event_id: &str,
        event_type: &str,
        action: PaymentEventAction,
    ) -> Result<WebhookOutcome, LedgerError> {
        let mut tx = WriteTransaction::begin_immediate(&self.pool).await?;
        if webhooks::fetch_webhook_event(event_id, &mut tx).await?.is_some() {
            tx.commit().await?;
            debug!("🗃️ Event {event_id} has already been processed");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }
        let result = apply_payment_action(action, &mut tx).await;
        let unresolvable = matches!(&result, Err(e) if e.is_unresolvable_reference());
        if result.is_err() && !unresolvable {
            return result;
        }
        if !webhooks::insert_webhook_event(event_id, event_type, &mut tx).await? {
            // Unreachable while the write lock is held, but dropping the transaction rolls back our changes if it
            // ever happens.
            info!("🗃️ Event {event_id} was processed concurrently. Rolling back.");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }
        tx.commit().await?;
        result
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let inserted = webhooks::insert_webhook_event(event_id, event_type, &mut conn).await?;
        debug!("🗃️ Event {event_id} ({event_type}) marked as processed without being applied");
        Ok(inserted)
    }

    async fn fetch_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEvent>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let event = webhooks::fetch_webhook_event(event_id, &mut conn).await?;
        Ok(event)
    }
}

async fn resolve_order(order_id: Option<OrderId>, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order_id = order_id
        .ok_or_else(|| LedgerError::OrderNotFound("The event metadata does not carry an order id".to_string()))?;
    orders::fetch_order_by_order_id(&order_id, conn)
        .await?
        .ok_or_else(|| LedgerError::OrderNotFound(format!("Order {order_id} does not exist")))
}

async fn apply_payment_action(
    action: PaymentEventAction,
    conn: &mut SqliteConnection,
) -> Result<WebhookOutcome, LedgerError> {
    let now = Utc::now();
    match action {
        PaymentEventAction::PaymentSucceeded { order_id, payment_intent_id, charge_id } => {
            let order = resolve_order(order_id, &mut *conn).await?;
            match order.status {
                OrderStatusType::Pending | OrderStatusType::PaymentFailed => {
                    let new_order =
                        orders::mark_payment_succeeded(order.id, &payment_intent_id, charge_id.as_deref(), now, conn)
                            .await?;
                    info!("🗃️ Payment {payment_intent_id} confirmed for order {}", order.order_id);
                    Ok(WebhookOutcome::Applied(OrderChanged { old_order: order, new_order, ledger_entry: None }))
                },
                status => Ok(ignored(&order, status)),
            }
        },
        PaymentEventAction::PaymentFailed { order_id, payment_intent_id, reason } => {
            let order = resolve_order(order_id, &mut *conn).await?;
            match order.status {
                OrderStatusType::Pending | OrderStatusType::PaymentFailed => {
                    let new_order =
                        orders::mark_payment_failed(order.id, &payment_intent_id, reason.as_deref(), now, conn).await?;
                    info!(
                        "🗃️ Payment {payment_intent_id} failed for order {}. {}",
                        order.order_id,
                        reason.as_deref().unwrap_or("No reason given.")
                    );
                    Ok(WebhookOutcome::Applied(OrderChanged { old_order: order, new_order, ledger_entry: None }))
                },
                status => Ok(ignored(&order, status)),
            }
        },
        PaymentEventAction::RefundIssued { order_id, charge_id, amount_refunded } => {
            let order = resolve_order(order_id, &mut *conn).await?;
            if order.status == OrderStatusType::Cancelled {
                return Ok(ignored(&order, order.status));
            }
            let store_id = order.store_id.ok_or_else(|| {
                LedgerError::StoreNotFound(format!("Order {} is not assigned to a store", order.order_id))
            })?;
            let already_refunded = ledger::refunded_for_order(store_id, &order.order_id, &mut *conn).await?;
            let increment = amount_refunded - already_refunded;
            if !increment.is_positive() {
                return Ok(WebhookOutcome::Ignored(format!(
                    "{already_refunded} has already been refunded on order {}. Nothing new in this event.",
                    order.order_id
                )));
            }
            let entry = NewLedgerEntry::new(store_id, LedgerEntryType::Refund, -increment)
                .with_currency(order.currency.clone())
                .with_order_id(order.order_id.clone())
                .with_description(format!("Refund on charge {charge_id}"))
                .with_created_at(now);
            entry.validate()?;
            let entry = ledger::insert_entry(entry, &mut *conn).await?;
            let new_order = orders::mark_refunded(order.id, &charge_id, now, conn).await?;
            info!("🗃️ Refund of {increment} recorded against order {} for store {store_id}", order.order_id);
            Ok(WebhookOutcome::Applied(OrderChanged { old_order: order, new_order, ledger_entry: Some(entry) }))
        },
        PaymentEventAction::Unhandled => Ok(WebhookOutcome::Ignored("Unhandled event type".to_string())),
    }
}

fn ignored(order: &Order, status: OrderStatusType) -> WebhookOutcome {
    debug!("🗃️ Order {} is {status}. The event does not change it.", order.order_id);
    WebhookOutcome::Ignored(format!("Order {} is {status}", order.order_id))
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `MKT_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Ledger migrations complete");
        Ok(())
    }
}
