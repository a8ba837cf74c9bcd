use uuid::Uuid;

pub const IDEMPOTENCY_KEY_PREFIX: &str = "idem_";

/// Creates a new idempotency key: the `idem_` prefix followed by the 32 hex digits of a random v4 UUID.
pub fn generate_idempotency_key() -> String {
    format!("{IDEMPOTENCY_KEY_PREFIX}{}", Uuid::new_v4().simple())
}

/// Whether `key` has the shape of a key produced by [`generate_idempotency_key`].
pub fn is_idempotency_key(key: &str) -> bool {
    key.strip_prefix(IDEMPOTENCY_KEY_PREFIX)
        .map(|hex| hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}
