use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::WebhookEvent;

/// Records that the event has been processed. Returns `false` if the event id was already recorded.
pub async fn insert_webhook_event(
    event_id: &str,
    event_type: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT INTO webhook_events (event_id, event_type, processed_at) VALUES ($1, $2, $3)")
        .bind(event_id)
        .bind(event_type)
        .bind(Utc::now())
        .execute(conn)
        .await;
    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn fetch_webhook_event(
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookEvent>, sqlx::Error> {
    let event = sqlx::query_as("SELECT * FROM webhook_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(event)
}
