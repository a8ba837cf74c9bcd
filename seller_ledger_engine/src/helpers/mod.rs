mod idempotency_key;

pub use idempotency_key::{generate_idempotency_key, is_idempotency_key, IDEMPOTENCY_KEY_PREFIX};
