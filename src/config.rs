//! Connection options and their TOML configuration file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PgSqlError, Result};

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 5432;

/// Everything needed to open a connection.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Server host. A `host:port` value overrides `port`.
    pub host: String,
    /// Server port; 0 means the default port.
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Keep the password on the connection object after the handshake.
    pub keep_password: bool,
    pub connect_timeout_secs: Option<u64>,
    pub application_name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            keep_password: true,
            connect_timeout_secs: None,
            application_name: None,
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("keep_password", &self.keep_password)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl ConnectOptions {
    /// Create a new options builder
    pub fn builder() -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::default()
    }

    /// Parse options from the `[database]` table of a TOML document.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: None,
                source,
            })?;
        Ok(file.database)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            })?;
        Ok(file.database)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Host and port after applying the `host:port` shorthand and the default port.
    pub fn endpoint(&self) -> Result<(String, u16)> {
        split_host_port(&self.host, self.port)
    }
}

/// Splits `host:port` (or `[v6addr]:port`) shorthand. The port found in the
/// host string wins over `port`; a zero port becomes [`DEFAULT_PORT`].
pub fn split_host_port(host: &str, port: u16) -> Result<(String, u16)> {
    let (name, explicit) = if let Some(rest) = host.strip_prefix('[') {
        match rest.split_once(']') {
            Some((addr, tail)) => (addr, tail.strip_prefix(':')),
            None => (host, None),
        }
    } else if host.matches(':').count() == 1 {
        match host.split_once(':') {
            Some((name, p)) => (name, Some(p)),
            None => (host, None),
        }
    } else {
        // bare IPv6 address or plain host name
        (host, None)
    };

    let port = match explicit {
        Some(p) => p
            .parse::<u16>()
            .map_err(|_| PgSqlError::InvalidParameter(format!("invalid port in host '{host}'")))?,
        None => port,
    };
    let port = if port == 0 { DEFAULT_PORT } else { port };
    Ok((name.to_string(), port))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    database: ConnectOptions,
}

/// Builder for ConnectOptions
#[derive(Debug, Default)]
pub struct ConnectOptionsBuilder {
    options: ConnectOptions,
}

impl ConnectOptionsBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.options.database = database.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.options.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.options.password = password.into();
        self
    }

    pub fn keep_password(mut self, keep: bool) -> Self {
        self.options.keep_password = keep;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.options.application_name = Some(name.into());
        self
    }

    /// Build the options
    pub fn build(self) -> ConnectOptions {
        self.options
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {source}")]
    Parse {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = ConnectOptions::default();
        assert_eq!(options.endpoint().unwrap(), ("127.0.0.1".to_string(), 5432));
        assert!(options.keep_password);
    }

    #[test]
    fn test_host_port_shorthand_overrides_port() {
        assert_eq!(
            split_host_port("db.local:6543", 5432).unwrap(),
            ("db.local".to_string(), 6543)
        );
        assert_eq!(
            split_host_port("[::1]:5433", 0).unwrap(),
            ("::1".to_string(), 5433)
        );
        assert_eq!(split_host_port("::1", 0).unwrap(), ("::1".to_string(), 5432));
        assert_eq!(
            split_host_port("localhost", 0).unwrap(),
            ("localhost".to_string(), 5432)
        );
        assert!(matches!(
            split_host_port("localhost:abc", 0),
            Err(PgSqlError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_toml() {
        let options = ConnectOptions::from_toml_str(
            r#"
            [database]
            host = "10.0.0.5:5499"
            database = "test"
            user = "test"
            password = "secret"
            keep_password = false
            connect_timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(options.endpoint().unwrap(), ("10.0.0.5".to_string(), 5499));
        assert_eq!(options.database, "test");
        assert!(!options.keep_password);
        assert_eq!(options.connect_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(options.application_name, None);
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let options = ConnectOptions::from_toml_str("").unwrap();
        assert_eq!(options, ConnectOptions::default());
    }

    #[test]
    fn test_parse_error() {
        let err = ConnectOptions::from_toml_str("[database]\nport = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = ConnectOptions::builder().password("hunter2").build();
        assert!(!format!("{options:?}").contains("hunter2"));
    }
}
