pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod ticket;
mod url;

pub use error::{InitError, StoreError};
pub use ticket::{Cancellation, WriteTicket};
pub use url::DatabaseUrl;

use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a [`RecordStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    Uninitialized,
    Ready,
    Closed,
}

enum StoreState {
    Uninitialized,
    Ready(Connection),
    Closed,
}

/// Append-only SQLite store for chat records.
///
/// Created empty; [`RecordStore::initialize`] opens the backend and creates
/// the schema, [`RecordStore::shutdown`] releases it. Every method takes
/// `&self`, so one store is shared behind an `Arc` by concurrent writers.
///
/// There is a single connection: appends and reads are serialized on it,
/// each holding it only for its own transaction.
pub struct RecordStore {
    state: Mutex<StoreState>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::Uninitialized),
        }
    }

    /// Opens the backend and ensures the schema exists. Valid exactly once.
    pub fn initialize(&self, url: &DatabaseUrl) -> Result<(), InitError> {
        let mut state = self.lock();
        match *state {
            StoreState::Ready(_) => return Err(InitError::AlreadyInitialized),
            StoreState::Closed => return Err(InitError::Closed),
            StoreState::Uninitialized => {}
        }

        let conn = open_connection(url)?;
        migrations::run(&conn)?;

        info!("Record store opened at {}", url);
        *state = StoreState::Ready(conn);
        Ok(())
    }

    /// Closes the connection. A no-op before `initialize` and after the first call.
    pub fn shutdown(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        let conn = match std::mem::replace(&mut *state, StoreState::Closed) {
            StoreState::Ready(conn) => conn,
            StoreState::Uninitialized => {
                *state = StoreState::Uninitialized;
                return Ok(());
            }
            StoreState::Closed => return Ok(()),
        };

        conn.close().map_err(|(_, e)| {
            error!("Error closing record store: {}", e);
            StoreError::Database(e)
        })?;

        info!("Record store closed");
        Ok(())
    }

    pub fn status(&self) -> StoreStatus {
        match *self.lock() {
            StoreState::Uninitialized => StoreStatus::Uninitialized,
            StoreState::Ready(_) => StoreStatus::Ready,
            StoreState::Closed => StoreStatus::Closed,
        }
    }

    /// Runs `f` against the open connection, or fails with the lifecycle error.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut state = self.lock();
        match &mut *state {
            StoreState::Ready(conn) => f(conn),
            StoreState::Uninitialized => Err(StoreError::NotReady),
            StoreState::Closed => Err(StoreError::Closed),
        }
    }

    // A panicking closure unwinds through its transaction, which rolls back
    // on drop, so the connection behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_connection(url: &DatabaseUrl) -> Result<Connection, InitError> {
    let conn = match url {
        DatabaseUrl::Memory => Connection::open_in_memory()?,
        DatabaseUrl::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| InitError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let conn = Connection::open(path)?;
            // WAL lets inspection tools read while the pipeline writes
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn
        }
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
