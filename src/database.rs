use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::config::ConnectOptions;
use crate::drivers::TokioPostgresDriver;
use crate::error::{PgSqlError, Result};
use crate::library::PgSql;
use crate::query::PgSqlQuery;
use crate::traits::{Database, DatabaseDriver, DbQuery};

/// An established link: the driver and the runtime that drives it.
///
/// Field order matters: the driver (and its client handle) drops before the
/// runtime that owns the connection task.
pub(crate) struct Link {
    pub(crate) driver: Arc<dyn DatabaseDriver>,
    runtime: Runtime,
}

impl Link {
    /// Runs a driver future to completion on this link's runtime.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn new_runtime() -> Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// A blocking connection to a PostgreSQL server.
///
/// Every call blocks the calling thread until the server answers, so a
/// `PgSqlDb` must not be used from inside an async task. The object counts
/// as a live connection of its [`PgSql`] context from construction until it
/// is dropped, whether or not it is connected.
pub struct PgSqlDb {
    library: PgSql,
    host: String,
    port: u16,
    database: String,
    user: String,
    password: Option<String>,
    link: Option<Link>,
}

impl PgSqlDb {
    /// Creates an unconnected database object.
    /// Fails if `library` has already been quit.
    pub fn new(library: &PgSql) -> Result<Self> {
        library.acquire()?;
        Ok(Self {
            library: library.clone(),
            host: String::new(),
            port: 0,
            database: String::new(),
            user: String::new(),
            password: None,
            link: None,
        })
    }

    /// Creates a database object already connected through `driver`.
    pub fn with_driver(library: &PgSql, driver: Arc<dyn DatabaseDriver>) -> Result<Self> {
        let mut db = Self::new(library)?;
        db.link = Some(Link {
            driver,
            runtime: new_runtime()?,
        });
        Ok(db)
    }

    /// Connect using positional arguments. See [`Database::connect`].
    pub fn connect(
        &mut self,
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: &str,
        keep_password: bool,
    ) -> Result<()> {
        let options = ConnectOptions {
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            keep_password,
            ..ConnectOptions::default()
        };
        self.connect_with(&options)
    }

    /// Connect to the server described by `options`.
    ///
    /// An existing link is closed first. On failure the object is left
    /// disconnected and the error carries the server's message.
    pub fn connect_with(&mut self, options: &ConnectOptions) -> Result<()> {
        self.disconnect();

        let (host, port) = options.endpoint()?;
        let runtime = new_runtime()?;
        let driver = match runtime.block_on(TokioPostgresDriver::connect(options)) {
            Ok(driver) => driver,
            Err(e) => {
                tracing::warn!(
                    host = %host,
                    port,
                    database = %options.database,
                    error = %e,
                    "connection to postgresql failed"
                );
                return Err(e);
            }
        };

        self.host = host;
        self.port = port;
        self.database = options.database.clone();
        self.user = options.user.clone();
        self.password = options
            .keep_password
            .then(|| options.password.clone());
        self.link = Some(Link {
            driver: Arc::new(driver),
            runtime,
        });

        tracing::info!(
            host = %self.host,
            port = self.port,
            database = %self.database,
            user = %self.user,
            "connected to postgresql"
        );
        Ok(())
    }

    /// Close the link if there is one. Safe to call at any time.
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            drop(link);
            tracing::info!(host = %self.host, port = self.port, "disconnected from postgresql");
        }
    }

    /// Round trip to the server.
    pub fn ping_connection(&self) -> Result<()> {
        let link = self.link()?;
        link.block_on(link.driver.ping()).inspect_err(|e| {
            tracing::warn!(host = %self.host, error = %e, "ping failed");
        })
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Creates a query for `template` on this connection.
    ///
    /// The query borrows the connection, which therefore cannot be
    /// disconnected or reconnected while the query exists.
    pub fn new_query(&self, name: &str, template: &str) -> Result<PgSqlQuery<'_>> {
        self.link()?;
        PgSqlQuery::new(self, name, template)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Whether the password was kept after the handshake.
    pub fn retains_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn link(&self) -> Result<&Link> {
        self.link.as_ref().ok_or(PgSqlError::NotConnected)
    }
}

impl Drop for PgSqlDb {
    fn drop(&mut self) {
        self.disconnect();
        self.library.release();
    }
}

impl Database for PgSqlDb {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: &str,
        keep_password: bool,
    ) -> Result<()> {
        PgSqlDb::connect(self, host, port, database, user, password, keep_password)
    }

    fn disconnect(&mut self) {
        PgSqlDb::disconnect(self)
    }

    fn ping_connection(&self) -> Result<()> {
        PgSqlDb::ping_connection(self)
    }

    fn is_connected(&self) -> bool {
        PgSqlDb::is_connected(self)
    }

    fn new_query<'a>(&'a self, name: &str, query: &str) -> Result<Box<dyn DbQuery + 'a>> {
        Ok(Box::new(PgSqlDb::new_query(self, name, query)?))
    }
}
