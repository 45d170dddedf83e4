//! # Vaccine Scheduler Core
//!
//! Domain types, errors and storage traits for the vaccine reservation engine.
//!
//! Patients book vaccination appointments against two shared, mutable
//! resources: caregiver day-availability and per-vaccine dose inventory. A
//! reservation claims one availability, debits one dose and records one
//! appointment; a cancellation reverses all three. This crate defines the
//! vocabulary those operations are written in. It has no I/O of its own.
//!
//! ## Core Concepts
//!
//! - **Ledgers**: [`AvailabilityLedger`], [`DoseInventory`] and
//!   [`AppointmentLedger`] describe the three tables
//! - **Transactions**: a [`SchedulerStore`] hands out [`StoreTransaction`]s
//!   spanning all three ledgers, committed or rolled back as one unit
//! - **Identity**: [`IdentityStore`] holds patient and caregiver accounts
//! - **Ids**: an [`IdGenerator`] mints appointment ids with a bounded retry count
//! - **Actors**: every operation receives an explicit [`Actor`] instead of
//!   reading ambient session state
//!
//! ## Example
//!
//! ```
//! use vaccine_scheduler_core::{parse_date, Actor, Role, Username};
//!
//! let date = parse_date("2021-06-01").unwrap();
//! let dave = Actor::patient(Username::new("dave").unwrap());
//!
//! assert_eq!(dave.role(), Role::Patient);
//! assert!(dave.require(Role::Caregiver).is_err());
//! assert_eq!(date.to_string(), "2021-06-01");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod identity;
pub mod ledger;
pub mod types;

pub use chrono::NaiveDate;
pub use error::{Result, SchedulerError};
pub use id::{IdGenerator, RandomIdGenerator};
pub use identity::IdentityStore;
pub use ledger::{
    AppointmentLedger, AvailabilityLedger, DoseInventory, SchedulerStore, StoreTransaction,
};
pub use types::{
    Actor, Appointment, AppointmentId, DATE_FORMAT, Role, Username, Vaccine, VaccineName,
    dose_delta, parse_date,
};
