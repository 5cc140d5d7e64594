mod from_row;
mod schema;
pub mod queries;

pub use from_row::{FromRow, LICENSE_KEY_COLS, query_all, query_one};
pub use schema::init_db;

use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// License store connection pool
    pub db: DbPool,
    /// Upper bound on keys minted by a single generate request
    pub max_generate_count: u32,
}

/// Per-connection setup: wait on locks instead of failing with SQLITE_BUSY.
fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
}

pub fn create_pool(database_path: &str, max_size: u32) -> std::result::Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(configure_connection);
    Pool::builder().max_size(max_size).build(manager)
}

/// Run `f` inside an IMMEDIATE transaction: commit when it returns `Ok`,
/// roll back (on drop) when it returns `Err`.
///
/// IMMEDIATE takes the write lock up front so two writers cannot both read
/// a snapshot and then race to upgrade.
pub fn with_transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
