use crate::{db_types::IdempotencyKey, traits::LedgerError};

/// Storage for idempotency keys. Keys are insert-only: a stored key is never updated or deleted.
#[allow(async_fn_in_trait)]
pub trait IdempotencyManagement {
    /// Durably records `key` for the given operation and returns the stored row.
    ///
    /// Fails with [`LedgerError::IdempotencyKeyCollision`] if the key has been stored before.
    async fn store_idempotency_key(
        &self,
        key: &str,
        operation_type: &str,
        resource_id: &str,
    ) -> Result<IdempotencyKey, LedgerError>;

    /// Fetches the most recently stored key for the operation on the resource, if any.
    async fn fetch_latest_idempotency_key(
        &self,
        operation_type: &str,
        resource_id: &str,
    ) -> Result<Option<IdempotencyKey>, LedgerError>;

    async fn fetch_idempotency_key(&self, key: &str) -> Result<Option<IdempotencyKey>, LedgerError>;
}
