//! # Ledger backend contracts
//!
//! This module defines the behaviour a storage backend must provide to host the seller ledger.
//!
//! ## Ledger
//! A ledger is an append-only log of signed money movements per seller store. The seller's balance is never stored;
//! it is the sum of the balance-affecting entries and can always be rebuilt from the log.
//!
//! The [`LedgerDatabase`] trait exposes the mutating flows. Each method is a single atomic transaction: recording a
//! sale computes its fees, appends its entries and settles listing-fee debt, or does nothing at all.
//!
//! [`LedgerQueries`] provides read access to the log (listings, sums and counters).
//!
//! ## Processor integration
//! * [`IdempotencyManagement`] stores the single-use keys attached to retry-sensitive calls made to the payment
//!   processor.
//! * [`WebhookManagement`] applies processor events to local orders and the ledger exactly once.
//! * [`OrderManagement`] is the narrow port onto the marketplace's orders that reconciliation needs.
mod idempotency_management;
mod ledger_database;
mod ledger_queries;
mod order_management;
mod webhook_management;

pub use idempotency_management::IdempotencyManagement;
pub use ledger_database::{LedgerDatabase, LedgerError};
pub use ledger_queries::LedgerQueries;
pub use order_management::OrderManagement;
pub use webhook_management::WebhookManagement;
