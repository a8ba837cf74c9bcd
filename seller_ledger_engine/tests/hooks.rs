use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use seller_ledger_engine::{
    db_types::{Cents, NewOrder, OrderId, OrderStatusType},
    events::{EventHandlers, EventHooks},
    ledger_objects::SaleRecord,
    LedgerApi,
    LedgerConfig,
    OrderManagement,
    WebhookApi,
};
use serde_json::json;

mod support;

use support::prepare_env::{prepare_test_env, tear_down};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI64>,
    total: Arc<AtomicI64>,
}

impl HookCalled {
    pub fn called(&self, value: i64) {
        self.called.fetch_add(1, Ordering::SeqCst);
        self.total.fetch_add(value, Ordering::SeqCst);
    }

    pub fn count(&self) -> i64 {
        self.called.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn on_sale_recorded() {
    let db = prepare_test_env().await;
    let sales = HookCalled::default();
    let sales_copy = sales.clone();
    let mut hooks = EventHooks::default();
    hooks.on_sale_recorded(move |ev| {
        info!("🪝️ Sale recorded for store {}", ev.store_id);
        sales_copy.called(ev.breakdown.application_fee_cents.value());
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(8, hooks);
    let api = LedgerApi::new(db.clone(), LedgerConfig::default(), handlers.producers());
    let tasks = handlers.start_handlers();

    api.accrue_listing_fee(1, 10, None).await.unwrap();
    api.record_sale(SaleRecord::new(1, Cents::from(1000))).await.unwrap();
    api.record_sale(SaleRecord::new(1, Cents::from(500))).await.unwrap();
    // Failed sales are never published
    api.record_sale(SaleRecord::new(1, Cents::from(0))).await.unwrap_err();
    drop(api);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(sales.count(), 2);
    // (100 + 25) + 50
    assert_eq!(sales.total(), 175);
    tear_down(db).await;
}

#[tokio::test]
async fn on_order_status_changed() {
    let db = prepare_test_env().await;
    let changes = HookCalled::default();
    let changes_copy = changes.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_status_changed(move |ev| {
        assert_eq!(ev.old_order.status, OrderStatusType::Pending);
        assert_eq!(ev.new_order.status, OrderStatusType::Processing);
        changes_copy.called(1);
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(8, hooks);
    let api = WebhookApi::new(db.clone(), LedgerConfig::default(), handlers.producers());
    let tasks = handlers.start_handlers();

    db.insert_order(NewOrder::new(OrderId::from("5001"), Cents::from(900)).for_store(2)).await.unwrap();
    let event = json!({
        "id": "evt_h1",
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": "pi_1", "metadata": { "order_id": "5001" } } }
    })
    .to_string();
    api.handle_json(&event).await.unwrap();
    // Duplicates do not notify subscribers
    api.handle_json(&event).await.unwrap();
    drop(api);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(changes.count(), 1);
    tear_down(db).await;
}
