//! Read-only listings.

use super::discard;
use chrono::NaiveDate;
use vaccine_scheduler_core::{
    Actor, Appointment, AppointmentLedger, AvailabilityLedger, DoseInventory, Result,
    SchedulerStore, Username, Vaccine,
};

/// Who is free on a day, and what can be administered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    /// Requested day
    pub date: NaiveDate,
    /// Caregivers free that day, ordered by username
    pub caregivers: Vec<Username>,
    /// Every vaccine with its remaining doses, ordered by name
    pub vaccines: Vec<Vaccine>,
}

/// Listings over a [`SchedulerStore`]. Reads happen in a transaction that is
/// always rolled back.
#[derive(Debug, Clone)]
pub struct ScheduleBrowser<S> {
    store: S,
}

impl<S: SchedulerStore> ScheduleBrowser<S> {
    /// Create a browser over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Caregivers free on `date` and the current vaccine stock.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`](vaccine_scheduler_core::SchedulerError::Storage)
    /// on store failure.
    pub async fn search_caregiver_schedule(&self, date: NaiveDate) -> Result<DaySchedule> {
        let mut tx = self.store.begin().await?;
        let caregivers = tx.available_on(date).await;
        let vaccines = tx.list().await;
        discard(tx).await;

        Ok(DaySchedule {
            date,
            caregivers: caregivers?,
            vaccines: vaccines?,
        })
    }

    /// The actor's appointments, ordered by date then id.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`](vaccine_scheduler_core::SchedulerError::Storage)
    /// on store failure.
    pub async fn appointments(&self, actor: &Actor) -> Result<Vec<Appointment>> {
        let mut tx = self.store.begin().await?;
        let appointments = tx.list_for(actor).await;
        discard(tx).await;
        appointments
    }
}
