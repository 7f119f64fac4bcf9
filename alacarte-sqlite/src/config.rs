//! SQLite configuration.

use std::path::{Path, PathBuf};

use crate::error::{SqliteError, SqliteResult};

/// Where the database lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database, private to one engine.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database location.
    pub path: DatabasePath,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
        }
    }
}

impl SqliteConfig {
    /// Configuration for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` or `:memory:`
    /// - `sqlite://path/to/db.sqlite`
    /// - `sqlite:path/to/db.sqlite`
    /// - `file:path/to/db.sqlite`
    ///
    /// Recognized query options are `mode=memory`, `foreign_keys` and
    /// `busy_timeout` (milliseconds); others are ignored.
    ///
    /// ```rust
    /// use alacarte_sqlite::SqliteConfig;
    ///
    /// let config = SqliteConfig::from_url("sqlite://app.db?foreign_keys=false").unwrap();
    /// assert!(!config.foreign_keys);
    /// ```
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url = url.as_ref();
        let (location, options) = match url.split_once('?') {
            Some((location, options)) => (location, Some(options)),
            None => (url, None),
        };

        let path = if let Some(rest) = location.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = location.strip_prefix("sqlite:") {
            rest
        } else if let Some(rest) = location.strip_prefix("file:") {
            rest
        } else {
            location
        };

        let mut config = match path {
            "" => return Err(SqliteError::config(format!("database path is required: {url}"))),
            ":memory:" => Self::memory(),
            path => Self::file(path),
        };

        for pair in options.into_iter().flat_map(|o| o.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                "foreign_keys" => config.foreign_keys = parse_flag(key, value)?,
                "busy_timeout" => {
                    let ms = value.parse().map_err(|_| {
                        SqliteError::config(format!("busy_timeout must be milliseconds, got {value}"))
                    })?;
                    config.busy_timeout_ms = Some(ms);
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Pragmas run on every new connection.
    pub fn init_sql(&self) -> String {
        let mut sql = format!(
            "PRAGMA foreign_keys = {};\n",
            if self.foreign_keys { "ON" } else { "OFF" }
        );
        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {timeout};\n"));
        }
        sql
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }
}

fn parse_flag(key: &str, value: &str) -> SqliteResult<bool> {
    match value {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(SqliteError::config(format!("{key} must be a boolean, got {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_memory() {
        assert!(SqliteConfig::memory().path.is_memory());
        assert!(SqliteConfig::from_url("sqlite::memory:").unwrap().path.is_memory());
        assert!(SqliteConfig::from_url(":memory:").unwrap().path.is_memory());
        assert!(
            SqliteConfig::from_url("sqlite://cache.db?mode=memory")
                .unwrap()
                .path
                .is_memory()
        );
    }

    #[test]
    fn test_config_from_url_file() {
        for url in ["sqlite://./test.db", "sqlite:./test.db", "file:./test.db", "./test.db"] {
            let config = SqliteConfig::from_url(url).unwrap();
            assert_eq!(config.path, DatabasePath::File(PathBuf::from("./test.db")));
        }
    }

    #[test]
    fn test_config_from_url_with_options() {
        let config =
            SqliteConfig::from_url("sqlite://./test.db?foreign_keys=0&busy_timeout=10000&cache=shared")
                .unwrap();

        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, Some(10000));
    }

    #[test]
    fn test_config_from_url_rejects_bad_input() {
        assert!(SqliteConfig::from_url("sqlite://").is_err());
        assert!(SqliteConfig::from_url("sqlite://a.db?busy_timeout=soon").is_err());
        assert!(SqliteConfig::from_url("sqlite://a.db?foreign_keys=maybe").is_err());
    }

    #[test]
    fn test_init_sql() {
        assert_eq!(
            SqliteConfig::default().init_sql(),
            "PRAGMA foreign_keys = ON;\nPRAGMA busy_timeout = 5000;\n"
        );

        let config = SqliteConfig::memory().foreign_keys(false).busy_timeout(250);
        assert_eq!(
            config.init_sql(),
            "PRAGMA foreign_keys = OFF;\nPRAGMA busy_timeout = 250;\n"
        );
    }
}
