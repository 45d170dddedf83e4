//! Account storage used by login and account creation.
//!
//! The reservation engine never reads credentials; it only receives an
//! [`Actor`](crate::Actor) built after a successful login. This trait is the
//! narrow surface the account service needs from the identity tables.

use crate::error::Result;
use crate::types::{Role, Username};
use std::future::Future;

/// Patient and caregiver accounts.
pub trait IdentityStore: Send + Sync {
    /// Whether an account exists for `username` in the given role.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn exists(&self, role: Role, username: &Username) -> impl Future<Output = Result<bool>> + Send;

    /// Create an account with an already-hashed password.
    ///
    /// # Errors
    ///
    /// - [`Conflict`](crate::SchedulerError::Conflict) if the username is taken for this role
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn create(
        &self,
        role: Role,
        username: &Username,
        password_hash: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stored password hash (PHC string), or `None` for an unknown account.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn password_hash(
        &self,
        role: Role,
        username: &Username,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}
