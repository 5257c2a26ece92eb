//! Login/connection configuration.

use tds_protocol::version::TdsVersion;

use crate::error::Error;

/// Smallest packet size SQL Server will negotiate.
pub const MIN_PACKET_SIZE: u16 = 512;
/// Largest packet size SQL Server will negotiate.
pub const MAX_PACKET_SIZE: u16 = 32767;
/// Packet size used when none is configured.
pub const DEFAULT_PACKET_SIZE: u16 = 4096;

/// Connection and login parameters for a [`crate::Session`].
///
/// This struct is marked `#[non_exhaustive]` to allow adding fields in
/// future releases without breaking semver. Use [`Config::new`] or
/// [`Config::from_connection_string`] to construct instances, then the
/// builder methods to customize them.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Server hostname or IP address.
    pub server_name: String,
    /// Server port (default: 1433).
    pub port: u16,
    /// SQL authentication username.
    pub user_name: String,
    /// SQL authentication password.
    pub password: String,
    /// Initial database, if any.
    pub database: Option<String>,
    /// Application name reported during LOGIN7.
    pub app_name: String,
    /// Client hostname reported during LOGIN7.
    pub client_host: String,
    /// Client library name reported during LOGIN7.
    pub library_name: String,
    /// Client language reported during LOGIN7.
    pub language: Option<String>,
    /// Requested TDS packet size, bounds-checked to `512..=32767`.
    pub packet_size: u16,
    /// Requested TDS protocol version.
    pub tds_version: TdsVersion,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_string(),
            port: 1433,
            user_name: String::new(),
            password: String::new(),
            database: None,
            app_name: "tds-client".to_string(),
            client_host: hostname_or_default(),
            library_name: "tds-client".to_string(),
            language: None,
            packet_size: DEFAULT_PACKET_SIZE,
            tds_version: TdsVersion::V7_2,
        }
    }
}

fn hostname_or_default() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an ADO.NET-style connection string into configuration.
    ///
    /// ```text
    /// Server=localhost;Database=mydb;User Id=sa;Password=secret;
    /// ```
    pub fn from_connection_string(conn_str: &str) -> Result<Self, Error> {
        let mut config = Self::default();

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid key-value: {part}")))?;

            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "server" | "data source" | "host" => {
                    if let Some((host, port)) = value.split_once(',') {
                        config.server_name = host.to_string();
                        config.port = port
                            .parse()
                            .map_err(|_| Error::Config(format!("invalid port: {port}")))?;
                    } else {
                        config.server_name = value.to_string();
                    }
                }
                "port" => {
                    config.port = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid port: {value}")))?;
                }
                "database" | "initial catalog" => {
                    config.database = Some(value.to_string());
                }
                "user id" | "uid" | "user" => {
                    config.user_name = value.to_string();
                }
                "password" | "pwd" => {
                    config.password = value.to_string();
                }
                "application name" | "app" => {
                    config.app_name = value.to_string();
                }
                "workstation id" | "client host" => {
                    config.client_host = value.to_string();
                }
                "language" => {
                    config.language = Some(value.to_string());
                }
                "packet size" => {
                    let size: u16 = value
                        .parse()
                        .map_err(|_| Error::Config(format!("invalid packet size: {value}")))?;
                    config = config.packet_size(size)?;
                }
                "tdsversion" | "tds version" => {
                    config.tds_version = TdsVersion::parse(value).ok_or_else(|| {
                        Error::Config(format!(
                            "invalid TDS version: {value}. Supported: 7.0, 7.1, 7.2, 7.3, 7.3a, 7.3b, 7.4"
                        ))
                    })?;
                }
                _ => {
                    tracing::debug!(key = %key, value = %value, "ignoring unknown connection string option");
                }
            }
        }

        Ok(config)
    }

    /// Set the server host.
    #[must_use]
    pub fn server_name(mut self, host: impl Into<String>) -> Self {
        self.server_name = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set SQL authentication credentials.
    #[must_use]
    pub fn credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self.password = password.into();
        self
    }

    /// Set the initial database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name reported during LOGIN7.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the client hostname reported during LOGIN7.
    #[must_use]
    pub fn client_host(mut self, host: impl Into<String>) -> Self {
        self.client_host = host.into();
        self
    }

    /// Set the client library name reported during LOGIN7.
    #[must_use]
    pub fn library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Set the client language reported during LOGIN7.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the requested TDS packet size. Bounds-checked to `512..=32767`.
    pub fn packet_size(mut self, size: u16) -> Result<Self, Error> {
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) {
            return Err(Error::Config(format!(
                "packet size {size} out of range {MIN_PACKET_SIZE}..={MAX_PACKET_SIZE}"
            )));
        }
        self.packet_size = size;
        Ok(self)
    }

    /// Set the requested TDS protocol version.
    #[must_use]
    pub fn tds_version(mut self, version: TdsVersion) -> Self {
        self.tds_version = version;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string_parsing() {
        let config = Config::from_connection_string(
            "Server=localhost;Database=test;User Id=sa;Password=secret;",
        )
        .unwrap();

        assert_eq!(config.server_name, "localhost");
        assert_eq!(config.database, Some("test".to_string()));
        assert_eq!(config.user_name, "sa");
        assert_eq!(config.password, "secret");
    }

    #[test]
    fn test_connection_string_with_port() {
        let config =
            Config::from_connection_string("Server=localhost,1434;Database=test;").unwrap();

        assert_eq!(config.server_name, "localhost");
        assert_eq!(config.port, 1434);
    }

    #[test]
    fn test_connection_string_tds_version() {
        let config = Config::from_connection_string("Server=localhost;TDSVersion=7.3;").unwrap();
        assert_eq!(config.tds_version, TdsVersion::V7_3A);
    }

    #[test]
    fn test_connection_string_invalid_tds_version() {
        let result = Config::from_connection_string("Server=localhost;TDSVersion=invalid;");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_packet_size() {
        assert_eq!(Config::default().packet_size, DEFAULT_PACKET_SIZE);
    }

    #[test]
    fn test_packet_size_bounds() {
        assert!(Config::new().packet_size(256).is_err());
        assert!(Config::new().packet_size(40000).is_err());
        assert!(Config::new().packet_size(8192).is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::new()
            .server_name("db.example.com")
            .port(1434)
            .credentials("sa", "secret")
            .database("mydb")
            .app_name("myapp");

        assert_eq!(config.server_name, "db.example.com");
        assert_eq!(config.port, 1434);
        assert_eq!(config.user_name, "sa");
        assert_eq!(config.password, "secret");
        assert_eq!(config.database, Some("mydb".to_string()));
        assert_eq!(config.app_name, "myapp");
    }
}
