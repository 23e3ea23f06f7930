//! services/api/src/error.rs
//!
//! Startup failures of the analysis service. Request-time failures never reach
//! this type; the handlers turn port errors into `{success: false}` responses.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The pool could not be created or the database refused the connection.
    #[error("Database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not apply the mood-tracking migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving the router failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wiring problems detected before serving, such as a bad CORS origin.
    #[error("Startup failed: {0}")]
    Internal(String),
}
