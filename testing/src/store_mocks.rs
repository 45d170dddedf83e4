//! In-memory scheduler storage for fast, deterministic tests.
//!
//! - [`Tables`]: plain snapshot of every table, with builder helpers for seeding
//! - [`InMemorySchedulerStore`]: serialised transactions over shared [`Tables`]
//! - [`InMemoryTransaction`]: working copy applied on commit, discarded on drop
//! - [`InMemoryIdentityStore`]: accounts living in the same tables

#![allow(clippy::unwrap_used)] // Seeding helpers take literals and unwrap for brevity
#![allow(clippy::missing_panics_doc)] // Seeding helpers only panic on invalid literals

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use vaccine_scheduler_core::{
    Actor, Appointment, AppointmentId, AppointmentLedger, AvailabilityLedger, DoseInventory,
    IdentityStore, Result, Role, SchedulerError, SchedulerStore, StoreTransaction, Username,
    Vaccine, VaccineName, dose_delta, parse_date,
};

/// Every table of the scheduler, held by value.
///
/// Compare two snapshots with `==` to assert that an operation left no trace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tables {
    /// Patient accounts and their password hashes
    pub patients: BTreeMap<Username, String>,
    /// Caregiver accounts and their password hashes
    pub caregivers: BTreeMap<Username, String>,
    /// Published (date, caregiver) availabilities
    pub availabilities: BTreeSet<(NaiveDate, Username)>,
    /// Dose count per vaccine
    pub vaccines: BTreeMap<VaccineName, u32>,
    /// Booked appointments by id
    pub appointments: BTreeMap<AppointmentId, Appointment>,
}

impl Tables {
    /// Add a patient account with a placeholder password hash.
    #[must_use]
    pub fn patient(mut self, username: &str) -> Self {
        self.patients
            .insert(Username::new(username).unwrap(), String::new());
        self
    }

    /// Add a caregiver account with a placeholder password hash.
    #[must_use]
    pub fn caregiver(mut self, username: &str) -> Self {
        self.caregivers
            .insert(Username::new(username).unwrap(), String::new());
        self
    }

    /// Publish an availability. The caregiver account is created if missing.
    #[must_use]
    pub fn availability(mut self, date: &str, caregiver: &str) -> Self {
        let caregiver = Username::new(caregiver).unwrap();
        self.caregivers.entry(caregiver.clone()).or_default();
        self.availabilities
            .insert((parse_date(date).unwrap(), caregiver));
        self
    }

    /// Stock a vaccine with `doses` doses.
    #[must_use]
    pub fn vaccine(mut self, name: &str, doses: u32) -> Self {
        self.vaccines.insert(VaccineName::new(name).unwrap(), doses);
        self
    }

    /// Dose count of a vaccine, if stocked.
    #[must_use]
    pub fn doses(&self, name: &str) -> Option<u32> {
        self.vaccines.get(&VaccineName::new(name).unwrap()).copied()
    }

    /// Whether the caregiver is free on the date.
    #[must_use]
    pub fn is_available(&self, date: &str, caregiver: &str) -> bool {
        self.availabilities.contains(&(
            parse_date(date).unwrap(),
            Username::new(caregiver).unwrap(),
        ))
    }

    fn accounts(&self, role: Role) -> &BTreeMap<Username, String> {
        match role {
            Role::Patient => &self.patients,
            Role::Caregiver => &self.caregivers,
        }
    }

    fn accounts_mut(&mut self, role: Role) -> &mut BTreeMap<Username, String> {
        match role {
            Role::Patient => &mut self.patients,
            Role::Caregiver => &mut self.caregivers,
        }
    }
}

/// In-memory scheduler store.
///
/// Transactions are serialised: [`begin`](SchedulerStore::begin) waits until
/// the previous transaction has committed or been dropped. Clones share the
/// same tables.
///
/// # Example
///
/// ```
/// use vaccine_scheduler_testing::{InMemorySchedulerStore, Tables};
/// use vaccine_scheduler_core::{DoseInventory, SchedulerStore, StoreTransaction, VaccineName};
///
/// # async fn example() -> vaccine_scheduler_core::Result<()> {
/// let store = InMemorySchedulerStore::with_tables(Tables::default().vaccine("Pfizer", 2));
///
/// let mut tx = store.begin().await?;
/// tx.debit(&VaccineName::new("Pfizer")?, 1).await?;
/// tx.commit().await?;
///
/// assert_eq!(store.snapshot().await.doses("Pfizer"), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySchedulerStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemorySchedulerStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `tables`.
    #[must_use]
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Identity store backed by the same tables.
    #[must_use]
    pub fn identity_store(&self) -> InMemoryIdentityStore {
        InMemoryIdentityStore {
            tables: Arc::clone(&self.tables),
        }
    }
}

impl SchedulerStore for InMemorySchedulerStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTransaction { guard, working })
    }
}

/// Transaction over an [`InMemorySchedulerStore`].
///
/// Holds the store lock for its whole lifetime.
#[derive(Debug)]
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl AvailabilityLedger for InMemoryTransaction {
    async fn add(&mut self, date: NaiveDate, caregiver: &Username) -> Result<()> {
        if !self.working.caregivers.contains_key(caregiver) {
            return Err(SchedulerError::NotFound {
                entity: "Caregiver",
                key: caregiver.to_string(),
            });
        }
        let booked = self
            .working
            .appointments
            .values()
            .any(|a| a.date == date && &a.caregiver == caregiver);
        if booked {
            return Err(SchedulerError::Conflict(format!(
                "{caregiver} already has an appointment on {date}"
            )));
        }
        if !self.working.availabilities.insert((date, caregiver.clone())) {
            return Err(SchedulerError::Conflict(format!(
                "{caregiver} is already available on {date}"
            )));
        }
        Ok(())
    }

    async fn claim_any(&mut self, date: NaiveDate) -> Result<Username> {
        let slot = self
            .working
            .availabilities
            .iter()
            .find(|(d, _)| *d == date)
            .cloned()
            .ok_or(SchedulerError::NoAvailability { date })?;
        self.working.availabilities.remove(&slot);
        Ok(slot.1)
    }

    async fn restore(&mut self, date: NaiveDate, caregiver: &Username) -> Result<()> {
        self.working.availabilities.insert((date, caregiver.clone()));
        Ok(())
    }

    async fn available_on(&mut self, date: NaiveDate) -> Result<Vec<Username>> {
        Ok(self
            .working
            .availabilities
            .iter()
            .filter(|(d, _)| *d == date)
            .map(|(_, caregiver)| caregiver.clone())
            .collect())
    }
}

impl DoseInventory for InMemoryTransaction {
    async fn debit(&mut self, vaccine: &VaccineName, n: u32) -> Result<u32> {
        let doses = self
            .working
            .vaccines
            .get_mut(vaccine)
            .ok_or_else(|| SchedulerError::vaccine_not_found(vaccine))?;
        if *doses < n {
            return Err(SchedulerError::Depleted {
                vaccine: vaccine.clone(),
            });
        }
        *doses -= n;
        Ok(*doses)
    }

    async fn credit(&mut self, vaccine: &VaccineName, n: u32) -> Result<u32> {
        let doses = self
            .working
            .vaccines
            .get_mut(vaccine)
            .ok_or_else(|| SchedulerError::vaccine_not_found(vaccine))?;
        *doses = credited(*doses, n)?;
        Ok(*doses)
    }

    async fn create_or_credit(&mut self, vaccine: &VaccineName, n: i64) -> Result<u32> {
        let n = dose_delta(n)?;
        let doses = self.working.vaccines.entry(vaccine.clone()).or_insert(0);
        *doses = credited(*doses, n)?;
        Ok(*doses)
    }

    async fn doses(&mut self, vaccine: &VaccineName) -> Result<Option<u32>> {
        Ok(self.working.vaccines.get(vaccine).copied())
    }

    async fn list(&mut self) -> Result<Vec<Vaccine>> {
        Ok(self
            .working
            .vaccines
            .iter()
            .map(|(name, doses)| Vaccine::new(name.clone(), *doses))
            .collect())
    }
}

/// Mirror of the `INTEGER` column: the total must fit in `i32`.
fn credited(doses: u32, n: u32) -> Result<u32> {
    doses
        .checked_add(n)
        .filter(|total| i32::try_from(*total).is_ok())
        .ok_or_else(|| SchedulerError::Storage("dose count out of range".to_string()))
}

impl AppointmentLedger for InMemoryTransaction {
    async fn contains(&mut self, id: AppointmentId) -> Result<bool> {
        Ok(self.working.appointments.contains_key(&id))
    }

    async fn insert(&mut self, appointment: &Appointment) -> Result<()> {
        if self.working.appointments.contains_key(&appointment.id) {
            return Err(SchedulerError::DuplicateId { id: appointment.id });
        }
        let booked = self
            .working
            .appointments
            .values()
            .any(|a| a.date == appointment.date && a.patient == appointment.patient);
        if booked {
            return Err(SchedulerError::AlreadyBooked {
                patient: appointment.patient.clone(),
                date: appointment.date,
            });
        }
        if !self.working.patients.contains_key(&appointment.patient) {
            return Err(SchedulerError::NotFound {
                entity: "Patient",
                key: appointment.patient.to_string(),
            });
        }
        self.working
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get(&mut self, id: AppointmentId) -> Result<Appointment> {
        self.working
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| SchedulerError::appointment_not_found(id))
    }

    async fn find_for_patient_on(
        &mut self,
        patient: &Username,
        date: NaiveDate,
    ) -> Result<Option<Appointment>> {
        Ok(self
            .working
            .appointments
            .values()
            .find(|a| a.date == date && &a.patient == patient)
            .cloned())
    }

    async fn delete_owned(&mut self, id: AppointmentId, actor: &Actor) -> Result<Appointment> {
        let appointment = self.get(id).await?;
        if !appointment.is_participant(actor) {
            return Err(SchedulerError::Forbidden(format!(
                "appointment {id} does not belong to {}",
                actor.username()
            )));
        }
        self.working.appointments.remove(&id);
        Ok(appointment)
    }

    async fn list_for(&mut self, actor: &Actor) -> Result<Vec<Appointment>> {
        let mut mine: Vec<Appointment> = self
            .working
            .appointments
            .values()
            .filter(|a| a.is_participant(actor))
            .cloned()
            .collect();
        mine.sort_by_key(|a| (a.date, a.id));
        Ok(mine)
    }
}

impl StoreTransaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

/// In-memory identity store sharing tables with an [`InMemorySchedulerStore`].
///
/// Obtain one with [`InMemorySchedulerStore::identity_store`] so that accounts
/// created through it satisfy the scheduler's account references.
#[derive(Clone, Debug)]
pub struct InMemoryIdentityStore {
    tables: Arc<Mutex<Tables>>,
}

impl IdentityStore for InMemoryIdentityStore {
    async fn exists(&self, role: Role, username: &Username) -> Result<bool> {
        Ok(self.tables.lock().await.accounts(role).contains_key(username))
    }

    async fn create(&self, role: Role, username: &Username, password_hash: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let accounts = tables.accounts_mut(role);
        if accounts.contains_key(username) {
            return Err(SchedulerError::Conflict(format!(
                "username {username} is taken"
            )));
        }
        accounts.insert(username.clone(), password_hash.to_string());
        Ok(())
    }

    async fn password_hash(&self, role: Role, username: &Username) -> Result<Option<String>> {
        Ok(self.tables.lock().await.accounts(role).get(username).cloned())
    }
}
