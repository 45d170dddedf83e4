//! Interactive prompt loop.

use super::{CommandEngine, Reply};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use vaccine_scheduler_core::{IdGenerator, IdentityStore, SchedulerStore};

/// Reply printed for a line that is not valid UTF-8.
pub const INVALID_INPUT: &str = "Input is not valid UTF-8, please try again";

/// Read commands from `input` until `quit` or end of input, writing a prompt
/// before each line and one reply or error message after it.
///
/// Bad input never ends the loop; only I/O failures do.
///
/// # Example
///
/// ```
/// use vaccine_scheduler::command::{CommandEngine, run_prompt};
/// use vaccine_scheduler_core::RandomIdGenerator;
/// use vaccine_scheduler_testing::InMemorySchedulerStore;
///
/// # async fn example() -> std::io::Result<()> {
/// let store = InMemorySchedulerStore::new();
/// let identities = store.identity_store();
/// let mut engine = CommandEngine::new(store, identities, RandomIdGenerator::default());
///
/// let mut output = Vec::new();
/// run_prompt(&mut engine, &b"quit\n"[..], &mut output).await?;
/// assert_eq!(String::from_utf8_lossy(&output), "> Bye!\n");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the underlying error if reading `input` or writing `output` fails.
pub async fn run_prompt<S, I, G, R, W>(
    engine: &mut CommandEngine<S, I, G>,
    mut input: R,
    output: &mut W,
) -> std::io::Result<()>
where
    S: SchedulerStore + Clone,
    I: IdentityStore,
    G: IdGenerator,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            tracing::warn!(bytes = buf.len(), "Discarded non UTF-8 input line");
            output.write_all(format!("{INVALID_INPUT}\n").as_bytes()).await?;
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }

        let (text, quit) = match engine.execute_line(line).await {
            Ok(reply) => (reply.to_string(), reply.is_quit()),
            Err(e) => (e.to_string(), false),
        };
        output.write_all(format!("{text}\n").as_bytes()).await?;
        if quit {
            break;
        }
    }
    output.flush().await
}

/// Banner printed once before the first prompt.
#[must_use]
pub fn greeting() -> String {
    format!(
        "Welcome to the COVID-19 Vaccine Reservation Scheduling Application!\n{}\n",
        Reply::Help
    )
}
