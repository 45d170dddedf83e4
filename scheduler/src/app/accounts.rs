//! Account creation and login.
//!
//! Passwords are hashed with argon2 and a random salt; only the PHC string
//! reaches the identity store.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use vaccine_scheduler_core::{Actor, IdentityStore, Result, Role, SchedulerError, Username};

/// Creates accounts and checks credentials against an [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct AccountService<I> {
    identities: I,
}

impl<I: IdentityStore> AccountService<I> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(identities: I) -> Self {
        Self { identities }
    }

    /// Create an account for `username` in the given role.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::InvalidArgument`] for an empty password
    /// - [`SchedulerError::Conflict`] if the username is taken for this role
    /// - [`SchedulerError::Storage`] on store or hashing failure
    #[tracing::instrument(skip_all, fields(%role, %username))]
    pub async fn create(&self, role: Role, username: &Username, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(SchedulerError::InvalidArgument(
                "password cannot be empty".to_string(),
            ));
        }
        if self.identities.exists(role, username).await? {
            return Err(SchedulerError::Conflict(format!(
                "username {username} is taken, try again"
            )));
        }

        let password_hash = hash_password(password)?;
        self.identities.create(role, username, &password_hash).await?;

        tracing::info!("Account created");
        Ok(())
    }

    /// Check credentials and return the matching actor.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Unauthenticated`] for an unknown account or wrong password
    /// - [`SchedulerError::Storage`] on store failure
    #[tracing::instrument(skip_all, fields(%role, %username))]
    pub async fn login(&self, role: Role, username: &Username, password: &str) -> Result<Actor> {
        let Some(stored) = self.identities.password_hash(role, username).await? else {
            tracing::info!("Login for unknown account");
            return Err(SchedulerError::Unauthenticated);
        };

        if !verify_password(password, &stored) {
            tracing::info!("Login with wrong password");
            return Err(SchedulerError::Unauthenticated);
        }

        Ok(Actor::new(username.clone(), role))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SchedulerError::Storage(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(hash) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}
