//! # Vaccine Scheduler Testing
//!
//! Testing utilities and helpers for the vaccine reservation engine.
//!
//! This crate provides:
//! - An in-memory [`SchedulerStore`](vaccine_scheduler_core::SchedulerStore)
//!   and identity store
//! - Deterministic id generators
//! - Fixture helpers for dates, names and actors
//! - proptest strategies for reservation workloads
//!
//! ## Example
//!
//! ```
//! use vaccine_scheduler_testing::{InMemorySchedulerStore, Tables};
//!
//! # async fn example() {
//! let store = InMemorySchedulerStore::with_tables(
//!     Tables::default()
//!         .patient("dave")
//!         .availability("2021-06-01", "carol")
//!         .vaccine("Pfizer", 1),
//! );
//!
//! let tables = store.snapshot().await;
//! assert!(tables.is_available("2021-06-01", "carol"));
//! # }
//! ```

mod store_mocks;

pub use store_mocks::{
    InMemoryIdentityStore, InMemorySchedulerStore, InMemoryTransaction, Tables,
};

/// Deterministic id generators.
pub mod mocks {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Mutex, PoisonError};
    use vaccine_scheduler_core::{
        AppointmentId, AppointmentLedger, IdGenerator, Result, SchedulerError,
    };

    /// Hands out 1, 2, 3, ... skipping ids already in the ledger.
    ///
    /// # Example
    ///
    /// ```
    /// use vaccine_scheduler_testing::mocks::SequentialIdGenerator;
    ///
    /// let ids = SequentialIdGenerator::starting_at(100);
    /// assert_eq!(ids.peek(), 100);
    /// ```
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        next: AtomicI64,
        max_attempts: u32,
    }

    impl SequentialIdGenerator {
        /// Start at 1.
        #[must_use]
        pub const fn new() -> Self {
            Self::starting_at(1)
        }

        /// Start at `first`.
        #[must_use]
        pub const fn starting_at(first: i64) -> Self {
            Self {
                next: AtomicI64::new(first),
                max_attempts: 64,
            }
        }

        /// The next candidate, without consuming it.
        #[must_use]
        pub fn peek(&self) -> i64 {
            self.next.load(Ordering::SeqCst)
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        async fn next_id<L: AppointmentLedger>(&self, ledger: &mut L) -> Result<AppointmentId> {
            for _ in 0..self.max_attempts {
                let candidate = AppointmentId::new(self.next.fetch_add(1, Ordering::SeqCst))?;
                if !ledger.contains(candidate).await? {
                    return Ok(candidate);
                }
            }
            Err(SchedulerError::ResourceExhausted {
                attempts: self.max_attempts,
            })
        }
    }

    /// Always returns the same id without consulting the ledger.
    ///
    /// Used to force an insert collision after the availability and dose
    /// have already been taken.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedIdGenerator {
        id: AppointmentId,
    }

    impl FixedIdGenerator {
        /// Always hand out `id`.
        #[must_use]
        pub const fn new(id: AppointmentId) -> Self {
            Self { id }
        }
    }

    impl IdGenerator for FixedIdGenerator {
        async fn next_id<L: AppointmentLedger>(&self, _ledger: &mut L) -> Result<AppointmentId> {
            Ok(self.id)
        }
    }

    /// Hands out a fixed script of ids in order, without consulting the ledger.
    ///
    /// Models a concurrent reservation that inserts the drawn id between the
    /// ledger check and this transaction's insert.
    ///
    /// # Example
    ///
    /// ```
    /// use vaccine_scheduler_testing::mocks::ScriptedIdGenerator;
    ///
    /// let ids = ScriptedIdGenerator::new([7, 8]);
    /// assert_eq!(ids.remaining(), vec![7, 8]);
    /// ```
    #[derive(Debug)]
    pub struct ScriptedIdGenerator {
        script: Mutex<VecDeque<i64>>,
    }

    impl ScriptedIdGenerator {
        /// Hand out `ids` in order.
        #[must_use]
        pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
            Self {
                script: Mutex::new(ids.into_iter().collect()),
            }
        }

        /// Ids not handed out yet.
        #[must_use]
        pub fn remaining(&self) -> Vec<i64> {
            self.script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .copied()
                .collect()
        }
    }

    impl IdGenerator for ScriptedIdGenerator {
        async fn next_id<L: AppointmentLedger>(&self, _ledger: &mut L) -> Result<AppointmentId> {
            let next = self
                .script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            match next {
                Some(id) => AppointmentId::new(id),
                None => Err(SchedulerError::ResourceExhausted { attempts: 0 }),
            }
        }
    }
}

/// Fixture helpers. All of them panic on invalid literals.
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
pub mod fixtures {
    use chrono::NaiveDate;
    use vaccine_scheduler_core::{Actor, AppointmentId, Username, VaccineName, parse_date};

    /// Parse a `YYYY-MM-DD` literal.
    #[must_use]
    pub fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    /// Build a username.
    #[must_use]
    pub fn username(raw: &str) -> Username {
        Username::new(raw).unwrap()
    }

    /// Build a vaccine name.
    #[must_use]
    pub fn vaccine(raw: &str) -> VaccineName {
        VaccineName::new(raw).unwrap()
    }

    /// Build an appointment id.
    #[must_use]
    pub fn appointment_id(raw: i64) -> AppointmentId {
        AppointmentId::new(raw).unwrap()
    }

    /// Patient actor.
    #[must_use]
    pub fn patient(raw: &str) -> Actor {
        Actor::patient(username(raw))
    }

    /// Caregiver actor.
    #[must_use]
    pub fn caregiver(raw: &str) -> Actor {
        Actor::caregiver(username(raw))
    }
}

/// proptest strategies for reservation workloads.
pub mod properties {
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    /// Patients used by generated workloads.
    pub const PATIENTS: [&str; 4] = ["alice", "bob", "dave", "erin"];

    /// Caregivers used by generated workloads.
    pub const CAREGIVERS: [&str; 3] = ["carol", "frank", "grace"];

    /// Vaccines used by generated workloads.
    pub const VACCINES: [&str; 2] = ["Moderna", "Pfizer"];

    /// One of the first `days` days of May 2021.
    pub fn date_in_window(days: u64) -> impl Strategy<Value = NaiveDate> {
        (0..days.max(1)).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2021, 5, 1)
                .and_then(|start| start.checked_add_days(Days::new(offset)))
                .unwrap_or(NaiveDate::MIN)
        })
    }

    /// A `(patient, date, vaccine)` reservation request.
    pub fn reserve_request() -> impl Strategy<Value = (&'static str, NaiveDate, &'static str)> {
        (
            prop::sample::select(PATIENTS.to_vec()),
            date_in_window(3),
            prop::sample::select(VACCINES.to_vec()),
        )
    }

    /// A sequence of reservation requests.
    pub fn reserve_workload(
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(&'static str, NaiveDate, &'static str)>> {
        prop::collection::vec(reserve_request(), 0..max_len)
    }
}
