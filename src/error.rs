//! Defines the application's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` to allow `AppError` to be cloneable.

use std::sync::Arc;
use thiserror::Error;

/// The primary error enumeration for all application-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Connection or query failure originating from `sqlx`.
    #[error("Database Error: {0}")]
    Db(Arc<sqlx::Error>),

    /// Missing or invalid database configuration (driver, URL).
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error related to accessing environment variables.
    #[error("Environment Error: {0}")]
    Env(#[from] std::env::VarError),

    /// The insert statement completed but affected no rows.
    #[error("Insert failed, no rows affected")]
    InsertFailed,

    /// The insert succeeded but the store did not hand back a usable generated key.
    #[error("Insert succeeded but no generated key was returned")]
    MissingGeneratedKey,

    /// Error specific to CLI logic or argument handling.
    #[error("CLI Error: {0}")]
    Cli(String),
}

/// A specialized `Result` type using the application's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Db(Arc::new(err))
    }
}

impl From<clap::Error> for AppError {
    fn from(err: clap::Error) -> Self {
        AppError::Cli(err.to_string())
    }
}
