use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{PgSqlError, Result};

/// Library context shared by every `PgSqlDb`.
///
/// Created by [`PgSql::init`] and passed to each connection constructor.
/// Tracks how many connection objects are alive so that [`PgSql::quit`]
/// can refuse to tear down while any remain.
#[derive(Debug, Clone)]
pub struct PgSql {
    inner: Arc<Mutex<LibraryState>>,
}

/// Both fields are read and written under the same lock.
#[derive(Debug)]
struct LibraryState {
    active: bool,
    live_connections: usize,
}

impl PgSql {
    /// Initializes the library. Must be called before creating a `PgSqlDb`.
    pub fn init() -> Self {
        tracing::debug!("pgsql library initialized");
        Self {
            inner: Arc::new(Mutex::new(LibraryState {
                active: true,
                live_connections: 0,
            })),
        }
    }

    /// Tears the library down. Fails while connection objects still exist,
    /// in which case the context stays active.
    pub fn quit(&self) -> Result<()> {
        let mut state = self.state();
        if !state.active {
            return Ok(());
        }

        let live = state.live_connections;
        if live != 0 {
            tracing::error!(live, "trying to quit pgsql library but some databases still exist");
            return Err(PgSqlError::InvalidOperation(format!(
                "cannot quit the pgsql library while {live} connection(s) still exist"
            )));
        }

        state.active = false;
        tracing::debug!("pgsql library shut down");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Number of connection objects created from this context and not yet dropped.
    pub fn live_connections(&self) -> usize {
        self.state().live_connections
    }

    pub(crate) fn acquire(&self) -> Result<()> {
        let mut state = self.state();
        if !state.active {
            return Err(PgSqlError::InvalidPrecondition(
                "PgSql::init() must be called before creating a connection".to_string(),
            ));
        }
        state.live_connections += 1;
        Ok(())
    }

    pub(crate) fn release(&self) {
        let mut state = self.state();
        state.live_connections = state.live_connections.saturating_sub(1);
    }

    // no update panics halfway, so a poisoned lock still holds valid counts
    fn state(&self) -> MutexGuard<'_, LibraryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
