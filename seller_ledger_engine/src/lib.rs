//! Seller Ledger Engine
//!
//! The seller ledger is the financial core of a multi-seller marketplace. It records every money-moving event (sales,
//! platform fees, listing fees, refunds) as immutable signed entries, computes the platform's take on each
//! transaction, recovers outstanding listing fees from later sales, and applies payment-processor events exactly once.
//!
//! The library is divided into a few sections:
//! 1. Backend traits ([`mod@traits`]) and the SQLite backend that implements them ([`mod@sqlite`]). You should not
//!    need to talk to the database directly. The exception is the data types stored in it, which are defined in
//!    [`mod@db_types`] and are public.
//! 2. The public API objects: [`LedgerApi`], [`IdempotencyApi`] and [`WebhookApi`]. They are generic over the backend
//!    traits, so any backend implementing them can be used.
//! 3. Pure business rules that need no storage: the fee calculator ([`mod@fees`]) and the FIFO settlement planner
//!    ([`mod@settlement`]).
//!
//! The engine also publishes events after it commits changes. See [`mod@events`] for how to hook into them.
pub mod config;
pub mod db_types;
pub mod events;
pub mod fees;
pub mod helpers;
mod ledger_api;
pub mod settlement;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::LedgerConfig;
pub use ledger_api::{
    idempotency_api::IdempotencyApi,
    ledger_flow_api::LedgerApi,
    ledger_objects,
    webhook_api::WebhookApi,
    webhook_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{IdempotencyManagement, LedgerDatabase, LedgerError, LedgerQueries, OrderManagement, WebhookManagement};
