//! Reservation coordinator - the transactional core of the scheduler.
//!
//! Every operation runs inside one store transaction:
//!
//! - `reserve`: claim a caregiver, debit a dose, mint an id, record the appointment
//! - `cancel`: delete the appointment, return the dose, restore the availability
//!
//! Any failure rolls the whole transaction back, so a rejected reservation
//! never leaves a claimed availability or a debited dose behind.

use super::settle;
use chrono::NaiveDate;
use vaccine_scheduler_core::{
    Actor, Appointment, AppointmentId, AppointmentLedger, AvailabilityLedger, DoseInventory,
    IdGenerator, RandomIdGenerator, Result, Role, SchedulerError, SchedulerStore, Username,
    VaccineName, dose_delta,
};

/// Reservations retried after losing an appointment id to a concurrent insert.
pub const RESERVE_ATTEMPTS: u32 = 3;

/// Orchestrates the availability, dose and appointment ledgers.
///
/// # Example
///
/// ```
/// use vaccine_scheduler::app::ReservationCoordinator;
/// use vaccine_scheduler_core::{Actor, RandomIdGenerator, Username, VaccineName, parse_date};
/// use vaccine_scheduler_testing::{InMemorySchedulerStore, Tables};
///
/// # async fn example() -> vaccine_scheduler_core::Result<()> {
/// let store = InMemorySchedulerStore::with_tables(
///     Tables::default()
///         .patient("dave")
///         .availability("2021-06-01", "carol")
///         .vaccine("Pfizer", 1),
/// );
/// let coordinator = ReservationCoordinator::new(store, RandomIdGenerator::default());
///
/// let dave = Actor::patient(Username::new("dave")?);
/// let appointment = coordinator
///     .reserve(&dave, parse_date("2021-06-01")?, &VaccineName::new("Pfizer")?)
///     .await?;
/// assert_eq!(appointment.caregiver.as_str(), "carol");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReservationCoordinator<S, G = RandomIdGenerator> {
    store: S,
    ids: G,
}

impl<S, G> ReservationCoordinator<S, G>
where
    S: SchedulerStore,
    G: IdGenerator,
{
    /// Create a coordinator over `store`, minting ids with `ids`.
    #[must_use]
    pub const fn new(store: S, ids: G) -> Self {
        Self { store, ids }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Book the patient onto any caregiver free on `date`, using one dose of `vaccine`.
    ///
    /// On success exactly one availability and one dose are consumed and one
    /// appointment is created. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Forbidden`] if the actor is not a patient
    /// - [`SchedulerError::AlreadyBooked`] if the patient already has an appointment that day
    /// - [`SchedulerError::NoAvailability`] if no caregiver is free
    /// - [`SchedulerError::NotFound`] or [`SchedulerError::Depleted`] for the vaccine
    /// - [`SchedulerError::ResourceExhausted`] if no appointment id could be allocated
    /// - [`SchedulerError::DuplicateId`] if the drawn id was taken by a concurrent
    ///   reservation on every one of [`RESERVE_ATTEMPTS`] tries
    /// - [`SchedulerError::Storage`] on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor, %date, %vaccine))]
    pub async fn reserve(
        &self,
        actor: &Actor,
        date: NaiveDate,
        vaccine: &VaccineName,
    ) -> Result<Appointment> {
        let result = match actor.require(Role::Patient) {
            Ok(patient) => self.reserve_as(patient, date, vaccine).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(appointment) => {
                metrics::counter!("scheduler.reservations.created").increment(1);
                tracing::info!(
                    appointment_id = %appointment.id,
                    caregiver = %appointment.caregiver,
                    "Reservation created"
                );
            }
            Err(e) => {
                metrics::counter!("scheduler.reservations.rejected", "reason" => e.kind())
                    .increment(1);
                tracing::warn!(reason = e.kind(), error = %e, "Reservation rejected");
            }
        }
        result
    }

    async fn reserve_as(
        &self,
        patient: &Username,
        date: NaiveDate,
        vaccine: &VaccineName,
    ) -> Result<Appointment> {
        let mut attempt = 1;
        loop {
            let mut tx = self.store.begin().await?;
            let result = self.reserve_in(&mut tx, patient, date, vaccine).await;
            match settle(tx, result).await {
                Err(SchedulerError::DuplicateId { id }) if attempt < RESERVE_ATTEMPTS => {
                    tracing::debug!(attempt, %id, "Appointment id taken concurrently, retrying");
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn reserve_in(
        &self,
        tx: &mut S::Transaction,
        patient: &Username,
        date: NaiveDate,
        vaccine: &VaccineName,
    ) -> Result<Appointment> {
        if tx.find_for_patient_on(patient, date).await?.is_some() {
            return Err(SchedulerError::AlreadyBooked {
                patient: patient.clone(),
                date,
            });
        }

        let caregiver = tx.claim_any(date).await?;
        let remaining = tx.debit(vaccine, 1).await?;
        let id = self.ids.next_id(&mut *tx).await?;

        let appointment = Appointment::new(id, date, patient.clone(), caregiver, vaccine.clone());
        tx.insert(&appointment).await?;

        tracing::debug!(remaining, "Dose debited");
        Ok(appointment)
    }

    /// Cancel an appointment the actor takes part in.
    ///
    /// The dose goes back to the vaccine and the caregiver becomes available
    /// again on the appointment's date. Returns the cancelled appointment.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotFound`] if the appointment does not exist
    /// - [`SchedulerError::Forbidden`] if the actor is not its patient or caregiver
    /// - [`SchedulerError::Storage`] on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor, %id))]
    pub async fn cancel(&self, actor: &Actor, id: AppointmentId) -> Result<Appointment> {
        let mut tx = self.store.begin().await?;
        let result = Self::cancel_in(&mut tx, actor, id).await;

        match settle(tx, result).await {
            Ok(appointment) => {
                metrics::counter!("scheduler.appointments.cancelled").increment(1);
                tracing::info!(
                    date = %appointment.date,
                    caregiver = %appointment.caregiver,
                    vaccine = %appointment.vaccine,
                    "Appointment cancelled"
                );
                Ok(appointment)
            }
            Err(e) => {
                tracing::warn!(reason = e.kind(), error = %e, "Cancellation rejected");
                Err(e)
            }
        }
    }

    async fn cancel_in(
        tx: &mut S::Transaction,
        actor: &Actor,
        id: AppointmentId,
    ) -> Result<Appointment> {
        let appointment = tx.delete_owned(id, actor).await?;
        tx.credit(&appointment.vaccine, 1).await?;
        tx.restore(appointment.date, &appointment.caregiver).await?;
        Ok(appointment)
    }

    /// Publish that the caregiver can be booked on `date`.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Forbidden`] if the actor is not a caregiver
    /// - [`SchedulerError::Conflict`] if already published, or the caregiver
    ///   already has an appointment that day
    /// - [`SchedulerError::Storage`] on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor, %date))]
    pub async fn upload_availability(&self, actor: &Actor, date: NaiveDate) -> Result<()> {
        let caregiver = actor.require(Role::Caregiver)?;

        let mut tx = self.store.begin().await?;
        let result = tx.add(date, caregiver).await;
        settle(tx, result).await?;

        tracing::info!("Availability uploaded");
        Ok(())
    }

    /// Add `n` doses of `vaccine`, creating it if needed. Returns the new count.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Forbidden`] if the actor is not a caregiver
    /// - [`SchedulerError::InvalidArgument`] if `n` is negative or too large;
    ///   the store is not touched
    /// - [`SchedulerError::Storage`] on store failure
    #[tracing::instrument(skip_all, fields(actor = %actor, %vaccine, n))]
    pub async fn add_doses(&self, actor: &Actor, vaccine: &VaccineName, n: i64) -> Result<u32> {
        actor.require(Role::Caregiver)?;
        let delta = dose_delta(n)?;

        let mut tx = self.store.begin().await?;
        let result = tx.create_or_credit(vaccine, n).await;
        let doses = settle(tx, result).await?;

        metrics::counter!("scheduler.doses.added").increment(u64::from(delta));
        tracing::info!(doses, "Doses added");
        Ok(doses)
    }
}
