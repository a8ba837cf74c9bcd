use std::{fmt::Debug, future::Future};

use log::*;

use crate::{
    helpers::generate_idempotency_key,
    traits::{IdempotencyManagement, LedgerError},
};

/// Issues the keys that make outbound payment-processor calls safe to retry.
///
/// A key is always stored before it is handed out, so a crash between storing the key and making the external call
/// leaves a key behind that the retry will pick up.
pub struct IdempotencyApi<B> {
    db: B,
}

impl<B> Debug for IdempotencyApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdempotencyApi")
    }
}

impl<B> IdempotencyApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> IdempotencyApi<B>
where B: IdempotencyManagement
{
    /// Generates a fresh key for the operation on the resource and durably stores it before returning it.
    pub async fn generate_and_store(&self, operation_type: &str, resource_id: &str) -> Result<String, LedgerError> {
        let key = generate_idempotency_key();
        let stored = self.db.store_idempotency_key(&key, operation_type, resource_id).await?;
        trace!("🔑️ Issued {} for {operation_type} on {resource_id}", stored.idempotency_key);
        Ok(stored.idempotency_key)
    }

    /// The key most recently issued for the operation on the resource, if any.
    pub async fn latest_key_for(&self, operation_type: &str, resource_id: &str) -> Result<Option<String>, LedgerError> {
        let key = self.db.fetch_latest_idempotency_key(operation_type, resource_id).await?;
        Ok(key.map(|k| k.idempotency_key))
    }

    /// Returns the existing key for the operation on the resource, issuing a new one only if none exists. Retries of
    /// the same operation therefore present the same key to the processor.
    pub async fn key_for_attempt(&self, operation_type: &str, resource_id: &str) -> Result<String, LedgerError> {
        match self.latest_key_for(operation_type, resource_id).await? {
            Some(key) => {
                debug!("🔑️ Reusing {key} for {operation_type} on {resource_id}");
                Ok(key)
            },
            None => self.generate_and_store(operation_type, resource_id).await,
        }
    }

    /// Runs `call` with the idempotency key for the operation. The key is stored before `call` is invoked.
    pub async fn execute<F, Fut, T, E>(&self, operation_type: &str, resource_id: &str, call: F) -> Result<T, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LedgerError>,
    {
        let key = self.key_for_attempt(operation_type, resource_id).await?;
        trace!("🔑️ Calling {operation_type} on {resource_id} with {key}");
        call(key).await
    }

    pub async fn is_issued(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self.db.fetch_idempotency_key(key).await?.is_some())
    }
}
