//! End-to-end prompt sessions driven through [`CommandEngine::execute_line`].

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect

use vaccine_scheduler::{CommandEngine, Reply};
use vaccine_scheduler_core::{Role, SchedulerError};
use vaccine_scheduler_testing::mocks::SequentialIdGenerator;
use vaccine_scheduler_testing::{InMemoryIdentityStore, InMemorySchedulerStore};

type Engine = CommandEngine<InMemorySchedulerStore, InMemoryIdentityStore, SequentialIdGenerator>;

fn engine(store: &InMemorySchedulerStore) -> Engine {
    CommandEngine::new(store.clone(), store.identity_store(), SequentialIdGenerator::new())
}

async fn run(engine: &mut Engine, line: &str) -> String {
    engine
        .execute_line(line)
        .await
        .unwrap_or_else(|e| panic!("{line}: {e}"))
        .to_string()
}

#[tokio::test]
async fn test_full_session_between_caregiver_and_patient() {
    let store = InMemorySchedulerStore::new();
    let mut carol = engine(&store);
    let mut dave = engine(&store);

    run(&mut carol, "create_caregiver carol c-secret").await;
    run(&mut carol, "login_caregiver carol c-secret").await;
    assert_eq!(
        run(&mut carol, "upload_availability 2021-06-01").await,
        "Availability uploaded for 2021-06-01"
    );
    assert_eq!(
        run(&mut carol, "add_doses Pfizer 1").await,
        "Doses updated, Pfizer now has 1"
    );

    run(&mut dave, "create_patient dave d-secret").await;
    assert_eq!(
        run(&mut dave, "login_patient dave d-secret").await,
        "Logged in as patient dave"
    );

    let schedule = run(&mut dave, "search_caregiver_schedule 2021-06-01").await;
    assert!(schedule.contains("carol"), "{schedule}");
    assert!(schedule.contains("Pfizer 1"), "{schedule}");

    assert_eq!(
        run(&mut dave, "reserve 2021-06-01 Pfizer").await,
        "Reserved appointment 1 with caregiver carol on 2021-06-01"
    );

    let listing = run(&mut carol, "show_appointments").await;
    assert!(listing.contains("1  Pfizer  2021-06-01  dave"), "{listing}");

    assert_eq!(
        run(&mut dave, "cancel 1").await,
        "Cancelled appointment 1 on 2021-06-01"
    );
    assert_eq!(run(&mut dave, "show_appointments").await, "No appointments");

    let tables = store.snapshot().await;
    assert_eq!(tables.doses("Pfizer"), Some(1));
    assert!(tables.is_available("2021-06-01", "carol"));
}

#[tokio::test]
async fn test_commands_require_a_session() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);

    for line in [
        "search_caregiver_schedule 2021-06-01",
        "reserve 2021-06-01 Pfizer",
        "upload_availability 2021-06-01",
        "cancel 1",
        "add_doses Pfizer 3",
        "show_appointments",
        "logout",
    ] {
        let err = engine.execute_line(line).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthenticated), "{line}: {err:?}");
    }
}

#[tokio::test]
async fn test_account_commands_while_logged_in_conflict() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);
    run(&mut engine, "create_patient dave pw").await;
    run(&mut engine, "login_patient dave pw").await;

    for line in ["create_patient erin pw", "login_patient dave pw"] {
        let err = engine.execute_line(line).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Conflict(_)), "{line}: {err:?}");
    }

    let reply = engine.execute_line("logout").await.unwrap();
    assert!(matches!(reply, Reply::LoggedOut(ref actor) if actor.role() == Role::Patient));
    assert!(engine.session().actor().is_none());
    run(&mut engine, "create_patient erin pw").await;
}

#[tokio::test]
async fn test_login_failures_are_unauthenticated() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);
    run(&mut engine, "create_patient dave right").await;

    for line in [
        "login_patient dave wrong",
        "login_patient nobody right",
        "login_caregiver dave right",
    ] {
        let err = engine.execute_line(line).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthenticated), "{line}: {err:?}");
    }
    assert!(engine.session().actor().is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_rejected_per_role() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);
    run(&mut engine, "create_patient sam pw").await;

    let err = engine.execute_line("create_patient sam pw").await.unwrap_err();
    assert!(matches!(err, SchedulerError::Conflict(_)));
    run(&mut engine, "create_caregiver sam pw").await;
}

#[tokio::test]
async fn test_malformed_lines_do_not_touch_the_store() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);
    run(&mut engine, "create_caregiver carol pw").await;
    run(&mut engine, "login_caregiver carol pw").await;
    let before = store.snapshot().await;

    for line in [
        "add_doses Pfizer -5",
        "add_doses Pfizer many",
        "upload_availability 06/01/2021",
        "reserve 2021-06-01",
        "cancel abc",
        "frobnicate",
    ] {
        let err = engine.execute_line(line).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)), "{line}: {err:?}");
    }
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_help_and_quit() {
    let store = InMemorySchedulerStore::new();
    let mut engine = engine(&store);

    let help = run(&mut engine, "help").await;
    assert!(help.contains("> reserve <date> <vaccine>"));

    let reply = engine.execute_line("quit").await.unwrap();
    assert!(reply.is_quit());
    assert_eq!(reply.to_string(), "Bye!");
}
