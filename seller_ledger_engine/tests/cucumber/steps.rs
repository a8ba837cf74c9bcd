use cucumber::{then, when};
use seller_ledger_engine::{
    db_types::{Cents, LedgerEntryType, OrderId, OrderStatusType},
    ledger_objects::SaleRecord,
    webhook_objects::WebhookOutcome,
    LedgerError,
    OrderManagement,
};
use serde_json::json;

use crate::cucumber::LedgerWorld;

#[when(expr = "store {int} lists product {int} with a listing fee of {int} cents")]
async fn list_product(world: &mut LedgerWorld, store_id: i64, product_id: i64, fee: i64) {
    world.ledger().accrue_listing_fee(store_id, product_id, Some(Cents::from(fee))).await.expect("Error accruing fee");
}

#[when(expr = "store {int} lists product {int} with the default listing fee")]
async fn list_product_default_fee(world: &mut LedgerWorld, store_id: i64, product_id: i64) {
    world.ledger().accrue_listing_fee(store_id, product_id, None).await.expect("Error accruing fee");
}

#[when(expr = "{int} cents are recovered for store {int}")]
async fn recover(world: &mut LedgerWorld, amount: i64, store_id: i64) {
    let settled = world
        .ledger()
        .settle_oldest_listing_fees(store_id, Cents::from(amount), None)
        .await
        .expect("Error settling listing fees");
    world.last_settled = Some(settled);
}

#[when(expr = "store {int} sells goods for {int} cents with {int} cents shipping")]
async fn sell(world: &mut LedgerWorld, store_id: i64, subtotal: i64, shipping: i64) {
    let sale = SaleRecord::new(store_id, Cents::from(subtotal)).with_shipping(Cents::from(shipping));
    let breakdown = world.ledger().record_sale(sale).await.expect("Error recording sale");
    world.last_breakdown = Some(breakdown);
}

#[when(expr = "the processor sends event {word} of type {word} for order {word}")]
async fn processor_event(world: &mut LedgerWorld, event_id: String, event_type: String, order_id: String) {
    let event = json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": {
            "id": format!("pi_{order_id}"),
            "latest_charge": format!("ch_{order_id}"),
            "metadata": { "order_id": order_id }
        }}
    });
    let result = world.webhooks().handle_json(&event.to_string()).await;
    world.last_webhook = Some(result);
}

#[when(expr = "the processor reports a cumulative refund of {int} cents on order {word} in event {word}")]
async fn processor_refund(world: &mut LedgerWorld, amount: i64, order_id: String, event_id: String) {
    let event = json!({
        "id": event_id,
        "type": "charge.refunded",
        "data": { "object": {
            "id": format!("ch_{order_id}"),
            "amount_refunded": amount,
            "metadata": { "order_id": order_id }
        }}
    });
    let result = world.webhooks().handle_json(&event.to_string()).await;
    world.last_webhook = Some(result);
}

#[then(expr = "{int} listing fee(s) was/were settled")]
async fn check_settled(world: &mut LedgerWorld, count: usize) {
    assert_eq!(world.last_settled, Some(count));
}

#[then(expr = "store {int} has {int} unsettled listing fee(s)")]
async fn check_unsettled(world: &mut LedgerWorld, store_id: i64, count: i64) {
    let unsettled = world.ledger().count_unsettled(store_id, LedgerEntryType::ListingFeeAccrued).await.unwrap();
    assert_eq!(unsettled, count);
}

#[then(expr = "store {int} owes {int} cents in listing fees")]
async fn check_outstanding(world: &mut LedgerWorld, store_id: i64, amount: i64) {
    let owed = world.ledger().outstanding_listing_fees(store_id).await.unwrap();
    assert_eq!(owed, Cents::from(amount));
}

#[then(expr = "the balance of store {int} is {int} cents")]
async fn check_balance(world: &mut LedgerWorld, store_id: i64, amount: i64) {
    let balance = world.ledger().verify_balance(store_id).await.expect("Ledger does not replay to its balance");
    assert_eq!(balance, Cents::from(amount));
}

#[then(expr = "the platform fee is {int} cents")]
async fn check_platform_fee(world: &mut LedgerWorld, amount: i64) {
    let breakdown = world.last_breakdown.expect("No sale has been recorded");
    assert_eq!(breakdown.platform_fee_cents, Cents::from(amount));
}

#[then(expr = "the listing fee applied is {int} cents")]
async fn check_listing_fee_applied(world: &mut LedgerWorld, amount: i64) {
    let breakdown = world.last_breakdown.expect("No sale has been recorded");
    assert_eq!(breakdown.listing_fee_applied_cents, Cents::from(amount));
}

#[then(expr = "the application fee is {int} cents")]
async fn check_application_fee(world: &mut LedgerWorld, amount: i64) {
    let breakdown = world.last_breakdown.expect("No sale has been recorded");
    assert_eq!(breakdown.application_fee_cents, Cents::from(amount));
}

#[then(expr = "order {word} has status {word}")]
async fn check_order_status(world: &mut LedgerWorld, order_id: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world.db().fetch_order_by_order_id(&OrderId::from(order_id)).await.unwrap().expect("No such order");
    assert_eq!(order.status, expected);
}

#[then(expr = "event {word} is marked as processed")]
async fn check_processed(world: &mut LedgerWorld, event_id: String) {
    assert!(world.webhooks().is_processed(&event_id).await.unwrap());
}

#[then("the last event was a duplicate")]
async fn check_duplicate(world: &mut LedgerWorld) {
    assert!(matches!(world.last_webhook, Some(Ok(WebhookOutcome::AlreadyProcessed))));
}

#[then("the last event was applied")]
async fn check_applied(world: &mut LedgerWorld) {
    assert!(matches!(world.last_webhook, Some(Ok(WebhookOutcome::Applied(_)))));
}

#[then("the last event failed because the order was not found")]
async fn check_order_not_found(world: &mut LedgerWorld) {
    assert!(matches!(world.last_webhook, Some(Err(LedgerError::OrderNotFound(_)))));
}
