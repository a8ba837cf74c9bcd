//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or open an atomic transaction and
//! pass `&mut tx` through to the functions without any other changes.
//!
//! Anything that reads and then writes ledger state goes through [`WriteTransaction`], which takes SQLite's write lock
//! up front with `BEGIN IMMEDIATE`. Two deferred transactions that both read and then try to write deadlock on the
//! lock upgrade, and one of them fails with "database is locked" instead of waiting its turn.
use std::ops::{Deref, DerefMut};

use log::{info, warn};
use sqlx::{
    pool::PoolConnection,
    sqlite::SqlitePoolOptions,
    Error as SqlxError,
    Sqlite,
    SqliteConnection,
    SqlitePool,
};

use crate::config::database_url_from_env;

pub mod idempotency;
pub mod ledger;
pub mod orders;
pub mod webhooks;

pub fn db_url() -> String {
    let result = database_url_from_env();
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// A transaction that holds SQLite's write lock from the moment it begins.
///
/// Dereferences to the underlying connection, so it can be passed to the functions in this module as `&mut tx`.
/// If it is dropped without being committed, the connection is detached from the pool and closed, which rolls back
/// everything done inside the transaction.
pub struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    pub async fn begin_immediate(pool: &SqlitePool) -> Result<Self, SqlxError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub async fn commit(mut self) -> Result<(), SqlxError> {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
                // The transaction may still be open. Never hand it back to the pool in that state.
                drop(conn.detach());
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Deref for WriteTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("WriteTransaction used after commit")
    }
}

impl DerefMut for WriteTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("WriteTransaction used after commit")
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("🗃️ Write transaction dropped before commit. Rolling back.");
            drop(conn.detach());
        }
    }
}
