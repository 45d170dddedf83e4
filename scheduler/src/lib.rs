//! # Vaccine Scheduler
//!
//! COVID-19 vaccine reservation scheduler.
//!
//! Patients reserve appointments against caregiver availability and vaccine
//! dose inventory; caregivers publish availability and stock vaccines. The
//! crate is layered as:
//!
//! - [`app`]: transactional services ([`ReservationCoordinator`](app::ReservationCoordinator),
//!   [`AccountService`](app::AccountService), [`ScheduleBrowser`](app::ScheduleBrowser))
//! - [`command`]: line parser, session and command engine used by the prompt
//! - [`config`]: environment-driven configuration
//!
//! Storage is pluggable through the traits in `vaccine-scheduler-core`; the
//! binary wires in `vaccine-scheduler-postgres`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod command;
pub mod config;

pub use app::{AccountService, ReservationCoordinator, ScheduleBrowser};
pub use command::{Command, CommandEngine, Reply, Session};
pub use config::Config;
