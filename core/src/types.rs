//! Domain types for the vaccine reservation engine.
//!
//! All records are plain immutable values built through validating
//! constructors. Stores hand them out by value; nothing here talks to storage.

use crate::error::{Result, SchedulerError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar-date format accepted on the command line (`2021-05-01`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` literal into a calendar date.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidArgument`] if the literal is not a valid date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        SchedulerError::InvalidArgument(format!("'{raw}' is not a valid date (expected YYYY-MM-DD)"))
    })
}

/// Validate a dose delta coming from user input.
///
/// Dose counts are stored as 32-bit signed integers, so the delta must be
/// non-negative and fit in `i32`.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidArgument`] for negative or oversized values.
pub fn dose_delta(n: i64) -> Result<u32> {
    if n < 0 {
        return Err(SchedulerError::InvalidArgument(
            "doses cannot be negative".to_string(),
        ));
    }
    i32::try_from(n)
        .ok()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| SchedulerError::InvalidArgument(format!("{n} doses is too many")))
}

fn validate_token(kind: &str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(SchedulerError::InvalidArgument(format!("{kind} cannot be empty")));
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(SchedulerError::InvalidArgument(format!(
            "{kind} cannot contain whitespace"
        )));
    }
    Ok(())
}

// ============================================================================
// Identifiers
// ============================================================================

/// Account name of a patient or caregiver (case-sensitive).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a username.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] if the name is empty or
    /// contains whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_token("username", &raw)?;
        Ok(Self(raw))
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = SchedulerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a vaccine, e.g. `Pfizer` (case-sensitive).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaccineName(String);

impl VaccineName {
    /// Create a vaccine name.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] if the name is empty or
    /// contains whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_token("vaccine name", &raw)?;
        Ok(Self(raw))
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VaccineName {
    type Error = SchedulerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<VaccineName> for String {
    fn from(name: VaccineName) -> Self {
        name.0
    }
}

impl fmt::Display for VaccineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an appointment. Always strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct AppointmentId(i64);

impl AppointmentId {
    /// Create an appointment id.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`] if `id` is not positive.
    pub fn new(id: i64) -> Result<Self> {
        if id <= 0 {
            return Err(SchedulerError::InvalidArgument(format!(
                "appointment id must be positive, got {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Raw integer value, as stored.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for AppointmentId {
    type Error = SchedulerError;

    fn try_from(id: i64) -> Result<Self> {
        Self::new(id)
    }
}

impl From<AppointmentId> for i64 {
    fn from(id: AppointmentId) -> Self {
        id.0
    }
}

impl FromStr for AppointmentId {
    type Err = SchedulerError;

    fn from_str(raw: &str) -> Result<Self> {
        let id: i64 = raw.trim().parse().map_err(|_| {
            SchedulerError::InvalidArgument(format!("'{raw}' is not a valid appointment id"))
        })?;
        Self::new(id)
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actors
// ============================================================================

/// The two kinds of account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books and cancels appointments
    Patient,
    /// Publishes availability and stocks vaccines
    Caregiver,
}

impl Role {
    /// Lower-case name, as used in messages and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Caregiver => "caregiver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logged-in account on whose behalf an operation runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    username: Username,
    role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(username: Username, role: Role) -> Self {
        Self { username, role }
    }

    /// Patient actor.
    #[must_use]
    pub const fn patient(username: Username) -> Self {
        Self::new(username, Role::Patient)
    }

    /// Caregiver actor.
    #[must_use]
    pub const fn caregiver(username: Username) -> Self {
        Self::new(username, Role::Caregiver)
    }

    /// Account name.
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.username
    }

    /// Account role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Require a specific role.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Forbidden`] when the actor has another role.
    pub fn require(&self, role: Role) -> Result<&Username> {
        if self.role == role {
            Ok(&self.username)
        } else {
            Err(SchedulerError::Forbidden(format!(
                "please login as a {role} first"
            )))
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role, self.username)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A booked vaccination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identifier
    pub id: AppointmentId,
    /// Day of the appointment
    pub date: NaiveDate,
    /// Patient receiving the dose
    pub patient: Username,
    /// Caregiver administering the dose
    pub caregiver: Username,
    /// Vaccine administered
    pub vaccine: VaccineName,
}

impl Appointment {
    /// Create an appointment record.
    #[must_use]
    pub const fn new(
        id: AppointmentId,
        date: NaiveDate,
        patient: Username,
        caregiver: Username,
        vaccine: VaccineName,
    ) -> Self {
        Self {
            id,
            date,
            patient,
            caregiver,
            vaccine,
        }
    }

    /// Whether the actor takes part in this appointment in its own role.
    ///
    /// A patient must be the appointment's patient; a caregiver must be the
    /// appointment's caregiver.
    #[must_use]
    pub fn is_participant(&self, actor: &Actor) -> bool {
        match actor.role() {
            Role::Patient => &self.patient == actor.username(),
            Role::Caregiver => &self.caregiver == actor.username(),
        }
    }
}

/// A vaccine and its remaining dose count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccine {
    /// Vaccine name
    pub name: VaccineName,
    /// Remaining doses
    pub doses: u32,
}

impl Vaccine {
    /// Create a vaccine record.
    #[must_use]
    pub const fn new(name: VaccineName, doses: u32) -> Self {
        Self { name, doses }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn appointment() -> Appointment {
        Appointment::new(
            AppointmentId::new(7).unwrap(),
            parse_date("2021-06-01").unwrap(),
            Username::new("dave").unwrap(),
            Username::new("carol").unwrap(),
            VaccineName::new("Pfizer").unwrap(),
        )
    }

    #[test]
    fn test_parse_date_accepts_iso_dates() {
        let date = parse_date("2021-05-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 5, 1).unwrap());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for raw in ["", "tomorrow", "2021-13-01", "2021-02-30", "05/01/2021"] {
            assert!(
                matches!(parse_date(raw), Err(SchedulerError::InvalidArgument(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn test_dose_delta_bounds() {
        assert_eq!(dose_delta(0).unwrap(), 0);
        assert_eq!(dose_delta(5).unwrap(), 5);
        assert!(matches!(dose_delta(-5), Err(SchedulerError::InvalidArgument(_))));
        assert!(matches!(
            dose_delta(i64::from(i32::MAX) + 1),
            Err(SchedulerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_username_validation() {
        assert!(Username::new("alice").is_ok());
        assert!(Username::new("").is_err());
        assert!(Username::new("al ice").is_err());
        assert_ne!(Username::new("Alice").unwrap(), Username::new("alice").unwrap());
    }

    #[test]
    fn test_appointment_id_must_be_positive() {
        assert!(AppointmentId::new(1).is_ok());
        assert!(AppointmentId::new(0).is_err());
        assert!(AppointmentId::new(-3).is_err());
        assert_eq!("42".parse::<AppointmentId>().unwrap().get(), 42);
        assert!("forty-two".parse::<AppointmentId>().is_err());
    }

    #[test]
    fn test_participants_are_checked_per_role() {
        let appointment = appointment();
        let dave = Username::new("dave").unwrap();
        let carol = Username::new("carol").unwrap();

        assert!(appointment.is_participant(&Actor::patient(dave.clone())));
        assert!(appointment.is_participant(&Actor::caregiver(carol.clone())));
        // Right name, wrong role
        assert!(!appointment.is_participant(&Actor::caregiver(dave)));
        assert!(!appointment.is_participant(&Actor::patient(carol)));
        assert!(!appointment.is_participant(&Actor::patient(Username::new("erin").unwrap())));
    }

    #[test]
    fn test_actor_require_role() {
        let actor = Actor::patient(Username::new("alice").unwrap());
        assert_eq!(actor.require(Role::Patient).unwrap().as_str(), "alice");
        assert!(matches!(
            actor.require(Role::Caregiver),
            Err(SchedulerError::Forbidden(_))
        ));
    }
}
