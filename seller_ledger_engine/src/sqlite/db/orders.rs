use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderId, OrderStatusType};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), sqlx::Error> {
    let inserted = match fetch_order_by_order_id(&order.order_id, &mut *conn).await? {
        Some(order) => (order, false),
        None => {
            let order = insert_order(order, conn).await?;
            debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
            (order, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new order using the given connection. This is not atomic. You can embed this call inside a transaction
/// if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                store_id,
                total_price,
                currency,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, 'PENDING', $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.store_id)
    .bind(order.total_price)
    .bind(order.currency)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Moves the order to `PROCESSING` and records the processor's references. A previous failure reason is cleared.
pub async fn mark_payment_succeeded(
    id: i64,
    payment_intent_id: &str,
    charge_id: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            payment_intent_id = $2,
            charge_id = COALESCE($3, charge_id),
            failure_reason = NULL,
            updated_at = $4
        WHERE id = $5
        RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Processing)
    .bind(payment_intent_id)
    .bind(charge_id)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn mark_payment_failed(
    id: i64,
    payment_intent_id: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1, payment_intent_id = $2, failure_reason = $3, updated_at = $4
        WHERE id = $5
        RETURNING *;
        "#,
    )
    .bind(OrderStatusType::PaymentFailed)
    .bind(payment_intent_id)
    .bind(reason)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn mark_refunded(
    id: i64,
    charge_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
        UPDATE orders SET status = $1, charge_id = COALESCE(charge_id, $2), updated_at = $3
        WHERE id = $4
        RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Refunded)
    .bind(charge_id)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}
