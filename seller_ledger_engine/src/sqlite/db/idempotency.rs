use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{db_types::IdempotencyKey, traits::LedgerError};

pub async fn insert_key(
    key: &str,
    operation_type: &str,
    resource_id: &str,
    conn: &mut SqliteConnection,
) -> Result<IdempotencyKey, LedgerError> {
    let result = sqlx::query_as(
        r#"
        INSERT INTO idempotency_keys (idempotency_key, operation_type, resource_id, used_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *;
        "#,
    )
    .bind(key)
    .bind(operation_type)
    .bind(resource_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => LedgerError::IdempotencyKeyCollision(key.into()),
        _ => LedgerError::from(e),
    })?;
    Ok(result)
}

pub async fn fetch_latest_key(
    operation_type: &str,
    resource_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<IdempotencyKey>, sqlx::Error> {
    let key = sqlx::query_as(
        r#"
        SELECT * FROM idempotency_keys
        WHERE operation_type = $1 AND resource_id = $2
        ORDER BY used_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(operation_type)
    .bind(resource_id)
    .fetch_optional(conn)
    .await?;
    Ok(key)
}

pub async fn fetch_key(key: &str, conn: &mut SqliteConnection) -> Result<Option<IdempotencyKey>, sqlx::Error> {
    let key = sqlx::query_as("SELECT * FROM idempotency_keys WHERE idempotency_key = $1")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(key)
}
