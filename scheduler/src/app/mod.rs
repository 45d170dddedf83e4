//! Application services - everything the command engine dispatches into.
//!
//! - [`ReservationCoordinator`]: reserve, cancel, upload availability, add doses
//! - [`AccountService`]: account creation and credential checks
//! - [`ScheduleBrowser`]: read-only listings

mod accounts;
mod coordinator;
mod schedule;

pub use accounts::AccountService;
pub use coordinator::{RESERVE_ATTEMPTS, ReservationCoordinator};
pub use schedule::{DaySchedule, ScheduleBrowser};

use vaccine_scheduler_core::{Result, StoreTransaction};

/// Commit on success, roll back on failure.
///
/// A failed rollback is logged; the operation error is still returned.
async fn settle<T, X: StoreTransaction>(tx: X, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            discard(tx).await;
            Err(e)
        }
    }
}

/// Roll back, logging if the store could not confirm it.
async fn discard<X: StoreTransaction>(tx: X) {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(error = %rollback_err, "Failed to roll back transaction");
    }
}
