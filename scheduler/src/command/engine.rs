//! Command engine - dispatches parsed commands to the services.

use super::{Command, Session, USAGE};
use crate::app::{AccountService, DaySchedule, ReservationCoordinator, ScheduleBrowser};
use chrono::NaiveDate;
use std::fmt;
use vaccine_scheduler_core::{
    Actor, Appointment, IdGenerator, IdentityStore, RandomIdGenerator, Result, Role,
    SchedulerStore, Username, VaccineName,
};

/// Outcome of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// An account was created
    AccountCreated {
        /// Account kind
        role: Role,
        /// New username
        username: Username,
    },
    /// A session was started
    LoggedIn(Actor),
    /// Result of `search_caregiver_schedule`
    Schedule(DaySchedule),
    /// A reservation succeeded
    Reserved(Appointment),
    /// A caregiver published availability
    AvailabilityUploaded(NaiveDate),
    /// An appointment was cancelled
    Cancelled(Appointment),
    /// Doses were added
    DosesUpdated {
        /// Vaccine that was stocked
        vaccine: VaccineName,
        /// New dose count
        doses: u32,
    },
    /// Result of `show_appointments`
    Appointments {
        /// Whose appointments these are
        actor: Actor,
        /// Appointments ordered by date then id
        appointments: Vec<Appointment>,
    },
    /// The session ended
    LoggedOut(Actor),
    /// Command list
    Help,
    /// The prompt loop should stop
    Quit,
}

impl Reply {
    /// Whether the prompt loop should stop.
    #[must_use]
    pub const fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountCreated { role, username } => {
                write!(f, "Created {role} account {username}")
            }
            Self::LoggedIn(actor) => write!(f, "Logged in as {actor}"),
            Self::Schedule(schedule) => {
                writeln!(f, "Available caregivers on {}:", schedule.date)?;
                if schedule.caregivers.is_empty() {
                    writeln!(f, "  (none)")?;
                }
                for caregiver in &schedule.caregivers {
                    writeln!(f, "  {caregiver}")?;
                }
                write!(f, "Available vaccines:")?;
                if schedule.vaccines.is_empty() {
                    write!(f, "\n  (none)")?;
                }
                for vaccine in &schedule.vaccines {
                    write!(f, "\n  {} {}", vaccine.name, vaccine.doses)?;
                }
                Ok(())
            }
            Self::Reserved(appointment) => write!(
                f,
                "Reserved appointment {} with caregiver {} on {}",
                appointment.id, appointment.caregiver, appointment.date
            ),
            Self::AvailabilityUploaded(date) => write!(f, "Availability uploaded for {date}"),
            Self::Cancelled(appointment) => write!(
                f,
                "Cancelled appointment {} on {}",
                appointment.id, appointment.date
            ),
            Self::DosesUpdated { vaccine, doses } => {
                write!(f, "Doses updated, {vaccine} now has {doses}")
            }
            Self::Appointments {
                actor,
                appointments,
            } => {
                if appointments.is_empty() {
                    return write!(f, "No appointments");
                }
                let other = match actor.role() {
                    Role::Patient => "caregiver",
                    Role::Caregiver => "patient",
                };
                write!(f, "id  vaccine  date  {other}")?;
                for appointment in appointments {
                    let counterpart = match actor.role() {
                        Role::Patient => &appointment.caregiver,
                        Role::Caregiver => &appointment.patient,
                    };
                    write!(
                        f,
                        "\n{}  {}  {}  {counterpart}",
                        appointment.id, appointment.vaccine, appointment.date
                    )?;
                }
                Ok(())
            }
            Self::LoggedOut(actor) => write!(f, "Logged out {}", actor.username()),
            Self::Help => {
                let lines: Vec<String> = USAGE.iter().map(|usage| format!("> {usage}")).collect();
                write!(f, "{}", lines.join("\n"))
            }
            Self::Quit => write!(f, "Bye!"),
        }
    }
}

/// Holds the session and routes each command to the right service.
///
/// # Example
///
/// ```
/// use vaccine_scheduler::command::CommandEngine;
/// use vaccine_scheduler_core::RandomIdGenerator;
/// use vaccine_scheduler_testing::InMemorySchedulerStore;
///
/// # async fn example() -> vaccine_scheduler_core::Result<()> {
/// let store = InMemorySchedulerStore::new();
/// let identities = store.identity_store();
/// let mut engine = CommandEngine::new(store, identities, RandomIdGenerator::default());
///
/// engine.execute_line("create_caregiver carol secret").await?;
/// engine.execute_line("login_caregiver carol secret").await?;
/// let reply = engine.execute_line("add_doses Pfizer 10").await?;
/// assert_eq!(reply.to_string(), "Doses updated, Pfizer now has 10");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CommandEngine<S, I, G = RandomIdGenerator> {
    coordinator: ReservationCoordinator<S, G>,
    accounts: AccountService<I>,
    browser: ScheduleBrowser<S>,
    session: Session,
}

impl<S, I, G> CommandEngine<S, I, G>
where
    S: SchedulerStore + Clone,
    I: IdentityStore,
    G: IdGenerator,
{
    /// Create an engine with nobody logged in.
    #[must_use]
    pub fn new(store: S, identities: I, ids: G) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(store.clone(), ids),
            accounts: AccountService::new(identities),
            browser: ScheduleBrowser::new(store),
            session: Session::new(),
        }
    }

    /// Current session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Parse and execute one line of input.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidArgument`](vaccine_scheduler_core::SchedulerError::InvalidArgument)
    /// for malformed input, otherwise whatever [`execute`](Self::execute) returns.
    pub async fn execute_line(&mut self, line: &str) -> Result<Reply> {
        let command: Command = line.parse()?;
        self.execute(command).await
    }

    /// Execute one command on behalf of the session's actor.
    ///
    /// # Errors
    ///
    /// - [`Unauthenticated`](vaccine_scheduler_core::SchedulerError::Unauthenticated)
    ///   if the command needs a session and nobody is logged in
    /// - [`Conflict`](vaccine_scheduler_core::SchedulerError::Conflict) for
    ///   account commands issued while logged in
    /// - any error of the service the command is routed to
    #[tracing::instrument(skip_all, fields(command = command.name()))]
    pub async fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::CreateAccount {
                role,
                username,
                password,
            } => {
                self.session.require_anonymous()?;
                self.accounts.create(role, &username, &password).await?;
                Ok(Reply::AccountCreated { role, username })
            }
            Command::Login {
                role,
                username,
                password,
            } => {
                self.session.require_anonymous()?;
                let actor = self.accounts.login(role, &username, &password).await?;
                self.session.login(actor.clone())?;
                Ok(Reply::LoggedIn(actor))
            }
            Command::SearchCaregiverSchedule { date } => {
                self.session.require()?;
                let schedule = self.browser.search_caregiver_schedule(date).await?;
                Ok(Reply::Schedule(schedule))
            }
            Command::Reserve { date, vaccine } => {
                let actor = self.session.require()?;
                let appointment = self.coordinator.reserve(actor, date, &vaccine).await?;
                Ok(Reply::Reserved(appointment))
            }
            Command::UploadAvailability { date } => {
                let actor = self.session.require()?;
                self.coordinator.upload_availability(actor, date).await?;
                Ok(Reply::AvailabilityUploaded(date))
            }
            Command::Cancel { id } => {
                let actor = self.session.require()?;
                let appointment = self.coordinator.cancel(actor, id).await?;
                Ok(Reply::Cancelled(appointment))
            }
            Command::AddDoses { vaccine, doses } => {
                let actor = self.session.require()?;
                let doses = self.coordinator.add_doses(actor, &vaccine, doses).await?;
                Ok(Reply::DosesUpdated { vaccine, doses })
            }
            Command::ShowAppointments => {
                let actor = self.session.require()?.clone();
                let appointments = self.browser.appointments(&actor).await?;
                Ok(Reply::Appointments {
                    actor,
                    appointments,
                })
            }
            Command::Logout => self.session.logout().map(Reply::LoggedOut),
            Command::Help => Ok(Reply::Help),
            Command::Quit => Ok(Reply::Quit),
        }
    }
}
