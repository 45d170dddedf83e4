//! Vaccine scheduler interactive prompt.
//!
//! Reads one command per line from stdin and prints one reply per command.
//! Logs go to stderr so the prompt stays readable.

use anyhow::Context;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaccine_scheduler::command::{greeting, run_prompt};
use vaccine_scheduler::{CommandEngine, Config};
use vaccine_scheduler_postgres::PostgresSchedulerStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        max_connections = config.postgres.max_connections,
        id_upper_bound = config.appointments.id_upper_bound,
        "Configuration loaded"
    );

    let store = PostgresSchedulerStore::connect(&config.postgres_settings())
        .await
        .context("connecting to the database")?;
    store.migrate().await.context("running migrations")?;
    info!("Database ready");

    let identities = store.identity_store();
    let mut engine = CommandEngine::new(store, identities, config.id_generator());

    let mut stdout = tokio::io::stdout();
    stdout.write_all(greeting().as_bytes()).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    run_prompt(&mut engine, stdin, &mut stdout)
        .await
        .context("prompt I/O failed")?;

    info!("Scheduler stopped");
    Ok(())
}
