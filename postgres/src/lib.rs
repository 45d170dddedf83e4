//! `PostgreSQL` storage for the vaccine scheduler.
//!
//! This crate implements the storage traits from `vaccine-scheduler-core` on
//! top of sqlx:
//!
//! - [`PostgresSchedulerStore`]: hands out READ COMMITTED transactions over the
//!   availability, vaccine and appointment tables
//! - [`PostgresIdentityStore`]: patient and caregiver accounts
//!
//! Concurrency is handled by the database. Availability claims lock rows with
//! `FOR UPDATE SKIP LOCKED`, dose debits are conditional updates, and unique
//! constraints back the per-patient-per-day and id invariants.
//!
//! # Example
//!
//! ```no_run
//! use vaccine_scheduler_postgres::{PostgresSchedulerStore, PostgresSettings};
//!
//! # async fn example() -> vaccine_scheduler_core::Result<()> {
//! let store = PostgresSchedulerStore::connect(&PostgresSettings::new("postgres://localhost/scheduler")).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod identity;
mod transaction;

pub use identity::PostgresIdentityStore;
pub use transaction::PostgresTransaction;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use vaccine_scheduler_core::{Result, SchedulerError, SchedulerStore};

/// Connection settings for [`PostgresSchedulerStore::connect`].
#[derive(Debug, Clone)]
pub struct PostgresSettings {
    /// Connection string
    pub url: String,
    /// Pool size
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub connect_timeout: Duration,
    /// Server-side limit on any single statement
    pub statement_timeout: Duration,
}

impl PostgresSettings {
    /// Settings with default pool size and timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
            statement_timeout: Duration::from_secs(30),
        }
    }
}

/// `PostgreSQL` scheduler store.
#[derive(Clone, Debug)]
pub struct PostgresSchedulerStore {
    pool: PgPool,
}

impl PostgresSchedulerStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] if the URL is invalid or the
    /// database cannot be reached.
    pub async fn connect(settings: &PostgresSettings) -> Result<Self> {
        let options = PgConnectOptions::from_str(&settings.url)
            .map_err(|e| SchedulerError::Storage(format!("Invalid database URL: {e}")))?
            .options([(
                "statement_timeout",
                format!("{}ms", settings.statement_timeout.as_millis()),
            )]);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout)
            .connect_with(options)
            .await
            .map_err(|e| SchedulerError::Storage(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Identity store sharing this store's pool.
    #[must_use]
    pub fn identity_store(&self) -> PostgresIdentityStore {
        PostgresIdentityStore::new(self.pool.clone())
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SchedulerError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

impl SchedulerStore for PostgresSchedulerStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        PostgresTransaction::begin(&self.pool).await
    }
}

/// Map a sqlx error to [`SchedulerError::Storage`] with some context.
pub(crate) fn storage_error(context: &str, e: &sqlx::Error) -> SchedulerError {
    SchedulerError::Storage(format!("{context}: {e}"))
}

/// Name of the violated constraint, if the error is a constraint violation.
pub(crate) fn violated_constraint(e: &sqlx::Error) -> Option<&str> {
    match e {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// Reject rows that no longer satisfy the domain's validation.
pub(crate) fn corrupt_row(e: &SchedulerError) -> SchedulerError {
    SchedulerError::Storage(format!("Corrupt row: {e}"))
}
