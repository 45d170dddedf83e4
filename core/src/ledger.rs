//! Storage abstractions for the three shared resources.
//!
//! The reservation engine mutates three tables that must move together:
//! caregiver availability, vaccine dose inventory and appointments. Each table
//! is described by its own ledger trait, and a store hands out a
//! [`StoreTransaction`] that implements all three at once so a coordinator can
//! make several changes and then commit or roll back as a unit.
//!
//! # Implementations
//!
//! - `PostgresSchedulerStore` (in `vaccine-scheduler-postgres`): production store,
//!   READ COMMITTED transactions with row locks and conditional updates
//! - `InMemorySchedulerStore` (in `vaccine-scheduler-testing`): serialised
//!   transactions over in-memory tables, for fast deterministic tests
//!
//! # Send futures
//!
//! Methods return `impl Future + Send` rather than being declared `async fn`
//! so generic callers can be spawned onto a multi-threaded runtime.
//! Implementations are free to write them as `async fn`.

use crate::error::Result;
use crate::types::{Actor, Appointment, AppointmentId, Username, Vaccine, VaccineName};
use chrono::NaiveDate;
use std::future::Future;

/// Which caregiver is free on which date.
pub trait AvailabilityLedger: Send {
    /// Publish that `caregiver` can be booked on `date`.
    ///
    /// # Errors
    ///
    /// - [`Conflict`](crate::SchedulerError::Conflict) if the pair already
    ///   exists, or the caregiver already has an appointment that day
    /// - [`NotFound`](crate::SchedulerError::NotFound) if the caregiver is unknown
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn add(
        &mut self,
        date: NaiveDate,
        caregiver: &Username,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove and return one caregiver available on `date`.
    ///
    /// The caregiver with the lowest username wins. Rows held by another
    /// in-flight claim are skipped.
    ///
    /// # Errors
    ///
    /// - [`NoAvailability`](crate::SchedulerError::NoAvailability) if nobody is free
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn claim_any(&mut self, date: NaiveDate) -> impl Future<Output = Result<Username>> + Send;

    /// Put a previously claimed availability back.
    ///
    /// Restoring a pair that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn restore(
        &mut self,
        date: NaiveDate,
        caregiver: &Username,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Caregivers free on `date`, ordered by username.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn available_on(&mut self, date: NaiveDate)
    -> impl Future<Output = Result<Vec<Username>>> + Send;
}

/// Remaining doses per vaccine.
pub trait DoseInventory: Send {
    /// Take `n` doses, returning how many remain.
    ///
    /// The check and the decrement are one step: the count can never go
    /// negative, even with concurrent callers.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::SchedulerError::NotFound) if the vaccine is unknown
    /// - [`Depleted`](crate::SchedulerError::Depleted) if fewer than `n` doses remain
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn debit(
        &mut self,
        vaccine: &VaccineName,
        n: u32,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Return `n` doses, returning the new count.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::SchedulerError::NotFound) if the vaccine is unknown
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure or overflow
    fn credit(
        &mut self,
        vaccine: &VaccineName,
        n: u32,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Add `n` doses, creating the vaccine if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`](crate::SchedulerError::InvalidArgument) if `n` is
    ///   negative or too large
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn create_or_credit(
        &mut self,
        vaccine: &VaccineName,
        n: i64,
    ) -> impl Future<Output = Result<u32>> + Send;

    /// Current dose count, or `None` for an unknown vaccine.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn doses(&mut self, vaccine: &VaccineName) -> impl Future<Output = Result<Option<u32>>> + Send;

    /// Every vaccine, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn list(&mut self) -> impl Future<Output = Result<Vec<Vaccine>>> + Send;
}

/// Durable record of bookings.
pub trait AppointmentLedger: Send {
    /// Whether an appointment with this id exists.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn contains(&mut self, id: AppointmentId) -> impl Future<Output = Result<bool>> + Send;

    /// Record a new appointment.
    ///
    /// # Errors
    ///
    /// - [`Conflict`](crate::SchedulerError::Conflict) if the id is taken
    /// - [`AlreadyBooked`](crate::SchedulerError::AlreadyBooked) if the patient
    ///   already has an appointment that day
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn insert(&mut self, appointment: &Appointment) -> impl Future<Output = Result<()>> + Send;

    /// Look up an appointment.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::SchedulerError::NotFound) if absent
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn get(&mut self, id: AppointmentId) -> impl Future<Output = Result<Appointment>> + Send;

    /// The patient's appointment on `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn find_for_patient_on(
        &mut self,
        patient: &Username,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<Appointment>>> + Send;

    /// Delete an appointment the actor takes part in, returning the deleted record.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::SchedulerError::NotFound) if absent
    /// - [`Forbidden`](crate::SchedulerError::Forbidden) if the actor is not
    ///   the appointment's patient (or caregiver, for a caregiver actor)
    /// - [`Storage`](crate::SchedulerError::Storage) on store failure
    fn delete_owned(
        &mut self,
        id: AppointmentId,
        actor: &Actor,
    ) -> impl Future<Output = Result<Appointment>> + Send;

    /// The actor's appointments, ordered by date then id.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) on store failure.
    fn list_for(&mut self, actor: &Actor) -> impl Future<Output = Result<Vec<Appointment>>> + Send;
}

/// A unit of work spanning all three ledgers.
///
/// Nothing done through a transaction is visible to other callers until
/// [`commit`](StoreTransaction::commit). Dropping a transaction without
/// committing discards its changes.
pub trait StoreTransaction: AvailabilityLedger + DoseInventory + AppointmentLedger + Sized {
    /// Make every change in this transaction durable and visible.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) if the commit fails;
    /// in that case none of the changes were applied.
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    /// Discard every change in this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) if the store could not
    /// confirm the rollback.
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}

/// Source of transactions over the shared tables.
pub trait SchedulerStore: Send + Sync {
    /// Transaction type handed out by [`begin`](SchedulerStore::begin).
    type Transaction: StoreTransaction;

    /// Start a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Storage`](crate::SchedulerError::Storage) if no connection
    /// could be obtained.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}
