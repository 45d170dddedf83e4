//! `PostgreSQL` identity store.

use crate::storage_error;
use sqlx::PgPool;
use vaccine_scheduler_core::{IdentityStore, Result, Role, SchedulerError, Username};

/// Patient and caregiver accounts in the `patients` and `caregivers` tables.
#[derive(Clone, Debug)]
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Create a new identity store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const fn table(role: Role) -> &'static str {
    match role {
        Role::Patient => "patients",
        Role::Caregiver => "caregivers",
    }
}

impl IdentityStore for PostgresIdentityStore {
    async fn exists(&self, role: Role, username: &Username) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE username = $1)",
            table(role)
        );
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(username.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to look up account", &e))?;
        Ok(exists)
    }

    async fn create(&self, role: Role, username: &Username, password_hash: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (username, password_hash) VALUES ($1, $2)
             ON CONFLICT (username) DO NOTHING",
            table(role)
        );
        let result = sqlx::query(&sql)
            .bind(username.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to create account", &e))?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::Conflict(format!(
                "username {username} is taken"
            )));
        }
        tracing::debug!(%role, %username, "Account created");
        Ok(())
    }

    async fn password_hash(&self, role: Role, username: &Username) -> Result<Option<String>> {
        let sql = format!("SELECT password_hash FROM {} WHERE username = $1", table(role));
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| storage_error("Failed to load credentials", &e))?;
        Ok(row.map(|(hash,)| hash))
    }
}
