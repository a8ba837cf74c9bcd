use cucumber::given;
use seller_ledger_engine::{
    db_types::{Cents, NewOrder, OrderId},
    OrderManagement,
};

use crate::cucumber::{LedgerSystem, LedgerWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = LedgerSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "order {word} for store {int} totalling {int} cents")]
async fn order_for_store(world: &mut LedgerWorld, order_id: String, store_id: i64, total: i64) {
    let order = NewOrder::new(OrderId::from(order_id), Cents::from(total)).for_store(store_id);
    world.db().insert_order(order).await.expect("Error inserting order");
}
