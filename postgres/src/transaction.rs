//! READ COMMITTED transaction over the scheduler tables.

use crate::{corrupt_row, storage_error, violated_constraint};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use vaccine_scheduler_core::{
    Actor, Appointment, AppointmentId, AppointmentLedger, AvailabilityLedger, DoseInventory,
    Result, Role, SchedulerError, StoreTransaction, Username, Vaccine, VaccineName, dose_delta,
};

type AppointmentRow = (i64, NaiveDate, String, String, String);

/// Transaction handed out by [`PostgresSchedulerStore`](crate::PostgresSchedulerStore).
///
/// Dropping it without calling [`commit`](StoreTransaction::commit) rolls back.
#[derive(Debug)]
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTransaction {
    pub(crate) async fn begin(pool: &PgPool) -> Result<Self> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to begin transaction", &e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL READ COMMITTED")
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("Failed to set isolation level", &e))?;

        Ok(Self { tx })
    }
}

fn to_appointment((id, date, patient, caregiver, vaccine): AppointmentRow) -> Result<Appointment> {
    Ok(Appointment::new(
        AppointmentId::new(id).map_err(|e| corrupt_row(&e))?,
        date,
        Username::new(patient).map_err(|e| corrupt_row(&e))?,
        Username::new(caregiver).map_err(|e| corrupt_row(&e))?,
        VaccineName::new(vaccine).map_err(|e| corrupt_row(&e))?,
    ))
}

fn to_doses(doses: i32) -> Result<u32> {
    u32::try_from(doses).map_err(|_| SchedulerError::Storage(format!("Negative dose count: {doses}")))
}

fn to_param(n: u32) -> Result<i32> {
    i32::try_from(n).map_err(|_| SchedulerError::InvalidArgument(format!("{n} doses is too many")))
}

const fn participant_column(role: Role) -> &'static str {
    match role {
        Role::Patient => "patient_username",
        Role::Caregiver => "caregiver_username",
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Availability
// ═══════════════════════════════════════════════════════════════════════

impl AvailabilityLedger for PostgresTransaction {
    async fn add(&mut self, date: NaiveDate, caregiver: &Username) -> Result<()> {
        let (booked,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                 SELECT 1 FROM appointments WHERE slot_date = $1 AND caregiver_username = $2
             )",
        )
        .bind(date)
        .bind(caregiver.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to check caregiver appointments", &e))?;

        if booked {
            return Err(SchedulerError::Conflict(format!(
                "{caregiver} already has an appointment on {date}"
            )));
        }

        let result = sqlx::query(
            "INSERT INTO availabilities (slot_date, caregiver_username)
             VALUES ($1, $2)
             ON CONFLICT (slot_date, caregiver_username) DO NOTHING",
        )
        .bind(date)
        .bind(caregiver.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("availabilities_caregiver_fkey") => SchedulerError::NotFound {
                entity: "Caregiver",
                key: caregiver.to_string(),
            },
            _ => storage_error("Failed to add availability", &e),
        })?;

        if result.rows_affected() == 0 {
            return Err(SchedulerError::Conflict(format!(
                "{caregiver} is already available on {date}"
            )));
        }
        Ok(())
    }

    async fn claim_any(&mut self, date: NaiveDate) -> Result<Username> {
        let claimed: Option<(String,)> = sqlx::query_as(
            "DELETE FROM availabilities
             WHERE slot_date = $1
               AND caregiver_username = (
                   SELECT caregiver_username FROM availabilities
                   WHERE slot_date = $1
                   ORDER BY caregiver_username
                   LIMIT 1
                   FOR UPDATE SKIP LOCKED
               )
             RETURNING caregiver_username",
        )
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to claim availability", &e))?;

        let (caregiver,) = claimed.ok_or(SchedulerError::NoAvailability { date })?;
        Username::new(caregiver).map_err(|e| corrupt_row(&e))
    }

    async fn restore(&mut self, date: NaiveDate, caregiver: &Username) -> Result<()> {
        sqlx::query(
            "INSERT INTO availabilities (slot_date, caregiver_username)
             VALUES ($1, $2)
             ON CONFLICT (slot_date, caregiver_username) DO NOTHING",
        )
        .bind(date)
        .bind(caregiver.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to restore availability", &e))?;
        Ok(())
    }

    async fn available_on(&mut self, date: NaiveDate) -> Result<Vec<Username>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT caregiver_username FROM availabilities
             WHERE slot_date = $1
             ORDER BY caregiver_username",
        )
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to list availability", &e))?;

        rows.into_iter()
            .map(|(caregiver,)| Username::new(caregiver).map_err(|e| corrupt_row(&e)))
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Vaccines
// ═══════════════════════════════════════════════════════════════════════

impl PostgresTransaction {
    async fn vaccine_exists(&mut self, vaccine: &VaccineName) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vaccines WHERE name = $1)")
                .bind(vaccine.as_str())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| storage_error("Failed to look up vaccine", &e))?;
        Ok(exists)
    }
}

impl DoseInventory for PostgresTransaction {
    async fn debit(&mut self, vaccine: &VaccineName, n: u32) -> Result<u32> {
        let remaining: Option<(i32,)> = sqlx::query_as(
            "UPDATE vaccines SET doses = doses - $2
             WHERE name = $1 AND doses >= $2
             RETURNING doses",
        )
        .bind(vaccine.as_str())
        .bind(to_param(n)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to debit doses", &e))?;

        if let Some((doses,)) = remaining {
            return to_doses(doses);
        }
        if self.vaccine_exists(vaccine).await? {
            Err(SchedulerError::Depleted {
                vaccine: vaccine.clone(),
            })
        } else {
            Err(SchedulerError::vaccine_not_found(vaccine))
        }
    }

    async fn credit(&mut self, vaccine: &VaccineName, n: u32) -> Result<u32> {
        let updated: Option<(i32,)> = sqlx::query_as(
            "UPDATE vaccines SET doses = doses + $2
             WHERE name = $1
             RETURNING doses",
        )
        .bind(vaccine.as_str())
        .bind(to_param(n)?)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to credit doses", &e))?;

        let (doses,) = updated.ok_or_else(|| SchedulerError::vaccine_not_found(vaccine))?;
        to_doses(doses)
    }

    async fn create_or_credit(&mut self, vaccine: &VaccineName, n: i64) -> Result<u32> {
        let n = to_param(dose_delta(n)?)?;
        let (doses,): (i32,) = sqlx::query_as(
            "INSERT INTO vaccines (name, doses) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET doses = vaccines.doses + EXCLUDED.doses
             RETURNING doses",
        )
        .bind(vaccine.as_str())
        .bind(n)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to add doses", &e))?;

        to_doses(doses)
    }

    async fn doses(&mut self, vaccine: &VaccineName) -> Result<Option<u32>> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT doses FROM vaccines WHERE name = $1")
            .bind(vaccine.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| storage_error("Failed to look up doses", &e))?;

        row.map(|(doses,)| to_doses(doses)).transpose()
    }

    async fn list(&mut self) -> Result<Vec<Vaccine>> {
        let rows: Vec<(String, i32)> =
            sqlx::query_as("SELECT name, doses FROM vaccines ORDER BY name")
                .fetch_all(&mut *self.tx)
                .await
                .map_err(|e| storage_error("Failed to list vaccines", &e))?;

        rows.into_iter()
            .map(|(name, doses)| {
                Ok(Vaccine::new(
                    VaccineName::new(name).map_err(|e| corrupt_row(&e))?,
                    to_doses(doses)?,
                ))
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Appointments
// ═══════════════════════════════════════════════════════════════════════

impl AppointmentLedger for PostgresTransaction {
    async fn contains(&mut self, id: AppointmentId) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM appointments WHERE id = $1)")
                .bind(id.get())
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| storage_error("Failed to look up appointment id", &e))?;
        Ok(exists)
    }

    async fn insert(&mut self, appointment: &Appointment) -> Result<()> {
        sqlx::query(
            "INSERT INTO appointments
                 (id, slot_date, patient_username, caregiver_username, vaccine_name)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(appointment.id.get())
        .bind(appointment.date)
        .bind(appointment.patient.as_str())
        .bind(appointment.caregiver.as_str())
        .bind(appointment.vaccine.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some("appointments_pkey") => SchedulerError::DuplicateId { id: appointment.id },
            Some("appointments_patient_date_key") => SchedulerError::AlreadyBooked {
                patient: appointment.patient.clone(),
                date: appointment.date,
            },
            Some("appointments_patient_fkey") => SchedulerError::NotFound {
                entity: "Patient",
                key: appointment.patient.to_string(),
            },
            _ => storage_error("Failed to insert appointment", &e),
        })?;
        Ok(())
    }

    async fn get(&mut self, id: AppointmentId) -> Result<Appointment> {
        let row: Option<AppointmentRow> = sqlx::query_as(
            "SELECT id, slot_date, patient_username, caregiver_username, vaccine_name
             FROM appointments WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to get appointment", &e))?;

        to_appointment(row.ok_or_else(|| SchedulerError::appointment_not_found(id))?)
    }

    async fn find_for_patient_on(
        &mut self,
        patient: &Username,
        date: NaiveDate,
    ) -> Result<Option<Appointment>> {
        let row: Option<AppointmentRow> = sqlx::query_as(
            "SELECT id, slot_date, patient_username, caregiver_username, vaccine_name
             FROM appointments WHERE patient_username = $1 AND slot_date = $2",
        )
        .bind(patient.as_str())
        .bind(date)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to look up patient appointment", &e))?;

        row.map(to_appointment).transpose()
    }

    async fn delete_owned(&mut self, id: AppointmentId, actor: &Actor) -> Result<Appointment> {
        let row: Option<AppointmentRow> = sqlx::query_as(
            "SELECT id, slot_date, patient_username, caregiver_username, vaccine_name
             FROM appointments WHERE id = $1
             FOR UPDATE",
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| storage_error("Failed to lock appointment", &e))?;

        let appointment =
            to_appointment(row.ok_or_else(|| SchedulerError::appointment_not_found(id))?)?;
        if !appointment.is_participant(actor) {
            return Err(SchedulerError::Forbidden(format!(
                "appointment {id} does not belong to {}",
                actor.username()
            )));
        }

        sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| storage_error("Failed to delete appointment", &e))?;

        Ok(appointment)
    }

    async fn list_for(&mut self, actor: &Actor) -> Result<Vec<Appointment>> {
        let sql = format!(
            "SELECT id, slot_date, patient_username, caregiver_username, vaccine_name
             FROM appointments WHERE {} = $1
             ORDER BY slot_date, id",
            participant_column(actor.role())
        );
        let rows: Vec<AppointmentRow> = sqlx::query_as(&sql)
            .bind(actor.username().as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| storage_error("Failed to list appointments", &e))?;

        rows.into_iter().map(to_appointment).collect()
    }
}

impl StoreTransaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| storage_error("Failed to commit", &e))
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| storage_error("Failed to roll back", &e))
    }
}
