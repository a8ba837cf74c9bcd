//! The public API of the seller ledger.
//!
//! Each API object is generic over a backend that implements the traits in [`crate::traits`]. The API objects fill in
//! configured defaults, delegate to the backend, and notify event subscribers once the backend has committed.
pub mod idempotency_api;
pub mod ledger_flow_api;
pub mod ledger_objects;
pub mod webhook_api;
pub mod webhook_objects;
