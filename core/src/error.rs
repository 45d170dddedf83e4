//! Error taxonomy for the reservation engine.
//!
//! Every failure a command can hit maps to exactly one [`SchedulerError`]
//! variant. The `Display` output of each variant is the one-line message shown
//! at the prompt, so messages are written for end users rather than operators.

use crate::types::{AppointmentId, Username, VaccineName};
use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Everything that can go wrong while handling a scheduler command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// Malformed input: bad date literal, negative count, wrong arity.
    ///
    /// Always raised before the store is touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// No actor is logged in, or the supplied credentials were rejected.
    #[error("Please login first")]
    Unauthenticated,

    /// The actor has the wrong role or does not own the target record.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ═══════════════════════════════════════════════════════════
    // Resource Errors
    // ═══════════════════════════════════════════════════════════

    /// A referenced vaccine, appointment or account does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Key that was looked up
        key: String,
    },

    /// The write would duplicate an existing record.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The appointment id was taken between allocation and insert.
    ///
    /// Only concurrent reservations drawing the same id hit this; the
    /// coordinator retries the whole reservation.
    #[error("Appointment id {id} is already in use")]
    DuplicateId {
        /// Id that collided
        id: AppointmentId,
    },

    /// The patient already holds an appointment on this date.
    #[error("{patient} already has an appointment on {date}")]
    AlreadyBooked {
        /// Patient that tried to book
        patient: Username,
        /// Requested date
        date: NaiveDate,
    },

    /// No caregiver is available on the requested date.
    #[error("No caregiver is available on {date}, please pick a different date")]
    NoAvailability {
        /// Requested date
        date: NaiveDate,
    },

    /// The vaccine exists but has no doses left.
    #[error("Vaccine {vaccine} is out of doses")]
    Depleted {
        /// Vaccine that ran out
        vaccine: VaccineName,
    },

    /// No free appointment identifier was found within the attempt budget.
    #[error("Could not allocate an appointment id after {attempts} attempts")]
    ResourceExhausted {
        /// Number of candidates tried
        attempts: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// The backing store failed (connectivity, unexpected constraint, ...).
    ///
    /// Not retried; any partial effects of the call were rolled back.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SchedulerError {
    /// Shorthand for a [`SchedulerError::NotFound`] on a vaccine.
    #[must_use]
    pub fn vaccine_not_found(vaccine: &VaccineName) -> Self {
        Self::NotFound {
            entity: "Vaccine",
            key: vaccine.to_string(),
        }
    }

    /// Shorthand for a [`SchedulerError::NotFound`] on an appointment.
    #[must_use]
    pub fn appointment_not_found(id: AppointmentId) -> Self {
        Self::NotFound {
            entity: "Appointment",
            key: id.to_string(),
        }
    }

    /// Short, stable label used for metrics and structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::DuplicateId { .. } => "duplicate_id",
            Self::AlreadyBooked { .. } => "already_booked",
            Self::NoAvailability { .. } => "no_availability",
            Self::Depleted { .. } => "depleted",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_single_line() {
        let date = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
        let errors = vec![
            SchedulerError::InvalidArgument("bad date".to_string()),
            SchedulerError::Unauthenticated,
            SchedulerError::Forbidden("only patients can reserve".to_string()),
            SchedulerError::vaccine_not_found(&VaccineName::new("Pfizer").unwrap()),
            SchedulerError::AlreadyBooked {
                patient: Username::new("alice").unwrap(),
                date,
            },
            SchedulerError::NoAvailability { date },
            SchedulerError::DuplicateId {
                id: AppointmentId::new(7).unwrap(),
            },
            SchedulerError::ResourceExhausted { attempts: 64 },
        ];

        for error in errors {
            let message = error.to_string();
            assert!(!message.is_empty());
            assert!(!message.contains('\n'), "multi-line message: {message}");
        }
    }

    #[test]
    fn test_not_found_message_names_the_entity() {
        let error = SchedulerError::appointment_not_found(AppointmentId::new(42).unwrap());
        assert_eq!(error.to_string(), "Appointment not found: 42");
        assert_eq!(error.kind(), "not_found");
    }
}
