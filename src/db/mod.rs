//! Database layer for the daily task tracker.

pub mod export;
pub mod history;
pub mod lifetime;
pub mod stats;
pub mod streak;
pub mod tasks;
pub mod templates;

use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::error::is_contention;
use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
///
/// The mutex is the single-writer guarantee for the streak and lifetime
/// singletons: every mutation goes through [`Database::transact`].
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    clock: Clock,
    busy_retries: u32,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, store: &StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL for durability, bounded wait on lock contention
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_millis(store.busy_timeout_ms))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Clock::default(),
            busy_retries: store.busy_retries,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Clock::default(),
            busy_retries: StoreConfig::default().busy_retries,
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Replace the clock used for "today".
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Run database migrations.
    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        embedded::migrations::runner().run(&mut *conn)?;
        Ok(())
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Run `f` inside one immediate transaction.
    ///
    /// Busy/locked errors roll the transaction back and retry up to the
    /// configured limit; the last error is returned after that. `f` may run
    /// more than once, so it must not have effects outside the transaction.
    pub fn transact<F, T>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let mut attempt = 0;
        loop {
            match run_in_transaction(&mut conn, &mut f) {
                Err(e) if attempt < self.busy_retries && is_busy(&e) => {
                    attempt += 1;
                    warn!(attempt, error = %e, "Store busy, retrying transaction");
                    std::thread::sleep(Duration::from_millis(50 * u64::from(attempt)));
                }
                result => return result,
            }
        }
    }
}

fn run_in_transaction<F, T>(conn: &mut Connection, f: &mut F) -> Result<T>
where
    F: FnMut(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn is_busy(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .is_some_and(is_contention)
}
