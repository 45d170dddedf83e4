//! Appointment identifier allocation.

use crate::error::{Result, SchedulerError};
use crate::ledger::AppointmentLedger;
use crate::types::AppointmentId;
use rand::Rng;
use std::future::Future;

/// Largest id handed out by [`RandomIdGenerator`] unless configured otherwise.
pub const DEFAULT_ID_UPPER_BOUND: i64 = 9_999_999;

/// Candidates tried by [`RandomIdGenerator`] before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Produces appointment ids that are free in a ledger.
pub trait IdGenerator: Send + Sync {
    /// Return an id not currently present in `ledger`.
    ///
    /// Must terminate: implementations give up with
    /// [`ResourceExhausted`](SchedulerError::ResourceExhausted) instead of
    /// looping while the id space is saturated.
    ///
    /// The answer is only as fresh as the ledger's view: a concurrent
    /// transaction may insert the same id before this one does, in which case
    /// the insert fails with [`DuplicateId`](SchedulerError::DuplicateId).
    ///
    /// # Errors
    ///
    /// - [`ResourceExhausted`](SchedulerError::ResourceExhausted) when no free id was found
    /// - [`Storage`](SchedulerError::Storage) if the ledger lookup fails
    fn next_id<L: AppointmentLedger>(
        &self,
        ledger: &mut L,
    ) -> impl Future<Output = Result<AppointmentId>> + Send;
}

/// Draws ids uniformly from `1..=upper_bound`, retrying on collision.
///
/// # Example
///
/// ```
/// use vaccine_scheduler_core::id::RandomIdGenerator;
///
/// let ids = RandomIdGenerator::new(9_999_999, 64);
/// assert_eq!(ids.upper_bound(), 9_999_999);
/// ```
#[derive(Debug, Clone)]
pub struct RandomIdGenerator {
    upper_bound: i64,
    max_attempts: u32,
}

impl RandomIdGenerator {
    /// Create a generator. Bounds below 1 are raised to 1, and at least one
    /// attempt is always made.
    #[must_use]
    pub fn new(upper_bound: i64, max_attempts: u32) -> Self {
        Self {
            upper_bound: upper_bound.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Largest id this generator can return.
    #[must_use]
    pub const fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    /// Number of candidates tried before giving up.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn draw(&self) -> Result<AppointmentId> {
        let raw = rand::thread_rng().gen_range(1..=self.upper_bound);
        AppointmentId::new(raw)
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_UPPER_BOUND, DEFAULT_MAX_ATTEMPTS)
    }
}

impl IdGenerator for RandomIdGenerator {
    async fn next_id<L: AppointmentLedger>(&self, ledger: &mut L) -> Result<AppointmentId> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.draw()?;
            if !ledger.contains(candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, id = %candidate, "Appointment id collision, retrying");
        }

        tracing::warn!(
            attempts = self.max_attempts,
            upper_bound = self.upper_bound,
            "Appointment id space looks saturated"
        );
        Err(SchedulerError::ResourceExhausted {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_draws_stay_in_range() {
        let ids = RandomIdGenerator::new(3, 8);
        for _ in 0..200 {
            let id = ids.draw().unwrap().get();
            assert!((1..=3).contains(&id));
        }
    }

    #[test]
    fn test_degenerate_settings_are_clamped() {
        let ids = RandomIdGenerator::new(0, 0);
        assert_eq!(ids.upper_bound(), 1);
        assert_eq!(ids.max_attempts(), 1);
        assert_eq!(ids.draw().unwrap().get(), 1);
    }
}
