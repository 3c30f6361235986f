//! Connection settings for the `city` store.
//!
//! `DbConfig` is built once, either from the `DB_*` environment variables or
//! explicitly, and handed to the repository. Only the driver is validated up
//! front; a missing or malformed URL surfaces when a connection is attempted.

use crate::error::{AppError, Result};
use sqlx::any::AnyConnectOptions;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::postgres::PgConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error};

pub const DB_URL: &str = "DB_URL";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_DRIVER: &str = "DB_DRIVER";

/// Database backend selected through `DB_DRIVER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    MySql,
    Postgres,
    Sqlite,
}

impl Driver {
    /// Positional bind placeholder for the `n`th (1-based) parameter.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Driver::Postgres => format!("${}", n),
            Driver::MySql | Driver::Sqlite => "?".to_string(),
        }
    }

    /// Whether the insert can hand back the generated key through `RETURNING`.
    /// The other backends report it as the last insert id.
    pub fn returns_generated_key(self) -> bool {
        matches!(self, Driver::Postgres)
    }

    /// Whether the backend's `LOWER` folds non-ASCII letters. SQLite only
    /// folds ASCII, so name matching for it happens in Rust.
    pub fn folds_unicode_case(self) -> bool {
        !matches!(self, Driver::Sqlite)
    }

    /// Builds backend-specific connect options from a URL, applying explicit
    /// credentials on top of whatever the URL carries.
    pub fn connect_options(
        self,
        url: &str,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<AnyConnectOptions> {
        let options = match self {
            Driver::MySql => {
                let mut options = MySqlConnectOptions::from_str(url)?;
                if let Some(user) = user {
                    options = options.username(user);
                }
                if let Some(password) = password {
                    options = options.password(password);
                }
                AnyConnectOptions::from(options)
            },
            Driver::Postgres => {
                let mut options = PgConnectOptions::from_str(url)?;
                if let Some(user) = user {
                    options = options.username(user);
                }
                if let Some(password) = password {
                    options = options.password(password);
                }
                AnyConnectOptions::from(options)
            },
            // SQLite has no notion of users; credentials are ignored.
            Driver::Sqlite => AnyConnectOptions::from(SqliteConnectOptions::from_str(url)?),
        };
        Ok(options)
    }
}

impl FromStr for Driver {
    type Err = AppError;

    /// Accepts short names (`mysql`, `postgres`, `pg`, `sqlite`) as well as
    /// JDBC-style class names such as `com.mysql.cj.jdbc.Driver`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        if name == "pg" || name.contains("postgres") {
            Ok(Driver::Postgres)
        } else if name.contains("mysql") {
            Ok(Driver::MySql)
        } else if name.contains("sqlite") {
            Ok(Driver::Sqlite)
        } else {
            Err(AppError::Config(format!("Unsupported database driver: {:?}", s)))
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Driver::MySql => "mysql",
            Driver::Postgres => "postgres",
            Driver::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Connection string, credentials and driver for the backing store.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub driver: Driver,
}

impl DbConfig {
    #[allow(dead_code)] // Used when embedding the repository and in tests
    pub fn new(
        url: impl Into<String>,
        user: Option<String>,
        password: Option<String>,
        driver: Driver,
    ) -> Self {
        Self {
            url: Some(url.into()),
            user,
            password,
            driver,
        }
    }

    /// Reads `DB_URL`, `DB_USER`, `DB_PASSWORD` and `DB_DRIVER`, loading a
    /// `.env` file first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DB_DRIVER` is missing or names an
    /// unsupported backend. No operation can proceed without a driver, so
    /// callers treat this as fatal.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let driver = match optional_var(DB_DRIVER)? {
            Some(value) => value.parse::<Driver>()?,
            None => {
                error!("{} environment variable not set", DB_DRIVER);
                return Err(AppError::Config(format!("{} is not set", DB_DRIVER)));
            },
        };

        let config = Self {
            url: optional_var(DB_URL)?,
            user: optional_var(DB_USER)?,
            password: optional_var(DB_PASSWORD)?,
            driver,
        };
        debug!("Loaded database configuration: {:?}", config);
        Ok(config)
    }

    /// Connect options for a single connection.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when no URL is configured, `AppError::Db` when the
    /// URL cannot be parsed for the configured driver.
    pub fn connect_options(&self) -> Result<AnyConnectOptions> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| AppError::Config(format!("{} is not set", DB_URL)))?;
        self.driver
            .connect_options(url, self.user.as_deref(), self.password.as_deref())
    }

    /// The password as shown to humans: `****` when set, empty otherwise.
    pub fn masked_password(&self) -> &'static str {
        match self.password.as_deref() {
            Some(p) if !p.is_empty() => "****",
            _ => "",
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.masked_password())
            .field("driver", &self.driver)
            .finish()
    }
}

/// Unset and empty variables both read as `None`.
fn optional_var(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => {
            error!("{} environment variable is not valid unicode", key);
            Err(AppError::Env(e))
        },
    }
}
