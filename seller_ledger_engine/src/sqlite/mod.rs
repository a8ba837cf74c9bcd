//! SQLite backend for the seller ledger.
//!
//! Migrations live in `src/sqlite/migrations` and are embedded in the binary. Call [`SqliteDatabase::migrate`] once
//! at startup.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
