//! Property tests over random reservation workloads.
//!
//! Whatever sequence of reserve calls is issued, the committed tables must
//! keep these properties:
//! - a patient has at most one appointment per date
//! - every appointment consumed exactly one dose and one availability

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use proptest::prelude::*;
use vaccine_scheduler::ReservationCoordinator;
use vaccine_scheduler_testing::fixtures::{patient, vaccine};
use vaccine_scheduler_testing::mocks::SequentialIdGenerator;
use vaccine_scheduler_testing::properties::{
    CAREGIVERS, PATIENTS, VACCINES, date_in_window, reserve_workload,
};
use vaccine_scheduler_testing::{InMemorySchedulerStore, Tables};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime")
}

fn seeded(doses: u32, slots: &[(chrono::NaiveDate, usize)]) -> Tables {
    let mut tables = Tables::default();
    for name in PATIENTS {
        tables = tables.patient(name);
    }
    for name in VACCINES {
        tables = tables.vaccine(name, doses);
    }
    for (date, caregiver) in slots {
        let raw = date.format("%Y-%m-%d").to_string();
        tables = tables.availability(&raw, CAREGIVERS[caregiver % CAREGIVERS.len()]);
    }
    tables
}

fn slots() -> impl Strategy<Value = Vec<(chrono::NaiveDate, usize)>> {
    prop::collection::vec((date_in_window(3), 0..CAREGIVERS.len()), 0..9)
}

proptest! {
    #[test]
    fn prop_one_appointment_per_patient_per_day(
        doses in 0u32..6,
        slots in slots(),
        workload in reserve_workload(24),
    ) {
        let tables = seeded(doses, &slots);
        let store = InMemorySchedulerStore::with_tables(tables);
        let coordinator = ReservationCoordinator::new(store.clone(), SequentialIdGenerator::new());

        let after = runtime().block_on(async {
            for (who, date, name) in &workload {
                let _ = coordinator.reserve(&patient(who), *date, &vaccine(name)).await;
            }
            store.snapshot().await
        });

        let mut seen = std::collections::BTreeSet::new();
        for appointment in after.appointments.values() {
            prop_assert!(
                seen.insert((appointment.patient.clone(), appointment.date)),
                "{} booked twice on {}",
                appointment.patient,
                appointment.date
            );
        }
    }

    #[test]
    fn prop_doses_and_slots_are_conserved(
        doses in 0u32..6,
        slots in slots(),
        workload in reserve_workload(24),
    ) {
        let before = seeded(doses, &slots);
        let store = InMemorySchedulerStore::with_tables(before.clone());
        let coordinator = ReservationCoordinator::new(store.clone(), SequentialIdGenerator::new());

        let after = runtime().block_on(async {
            for (who, date, name) in &workload {
                let _ = coordinator.reserve(&patient(who), *date, &vaccine(name)).await;
            }
            store.snapshot().await
        });

        for name in VACCINES {
            let booked = after
                .appointments
                .values()
                .filter(|a| a.vaccine.as_str() == name)
                .count();
            let booked = u32::try_from(booked).unwrap();
            prop_assert_eq!(after.doses(name).unwrap() + booked, before.doses(name).unwrap());
        }

        prop_assert_eq!(
            after.availabilities.len() + after.appointments.len(),
            before.availabilities.len()
        );
        for appointment in after.appointments.values() {
            prop_assert!(
                before
                    .availabilities
                    .contains(&(appointment.date, appointment.caregiver.clone())),
                "appointment {} used a slot that was never published",
                appointment.id
            );
        }
    }

    #[test]
    fn prop_reserve_then_cancel_all_restores_the_tables(
        slots in slots(),
        workload in reserve_workload(12),
    ) {
        let before = seeded(4, &slots);
        let store = InMemorySchedulerStore::with_tables(before.clone());
        let coordinator = ReservationCoordinator::new(store.clone(), SequentialIdGenerator::new());

        let after = runtime().block_on(async {
            let mut booked = Vec::new();
            for (who, date, name) in &workload {
                if let Ok(appointment) =
                    coordinator.reserve(&patient(who), *date, &vaccine(name)).await
                {
                    booked.push(appointment);
                }
            }
            for appointment in booked.iter().rev() {
                coordinator
                    .cancel(&patient(appointment.patient.as_str()), appointment.id)
                    .await
                    .unwrap();
            }
            store.snapshot().await
        });

        prop_assert_eq!(after, before);
    }
}
