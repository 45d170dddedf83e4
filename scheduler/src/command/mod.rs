//! Line-oriented command surface.
//!
//! Each line of input is one command: a name followed by whitespace-separated
//! arguments. Parsing validates arity, dates, ids and counts so that malformed
//! input is rejected before any store is touched.

mod engine;
mod prompt;
mod session;

pub use engine::{CommandEngine, Reply};
pub use prompt::{INVALID_INPUT, greeting, run_prompt};
pub use session::Session;

use chrono::NaiveDate;
use std::str::FromStr;
use vaccine_scheduler_core::{
    AppointmentId, Result, Role, SchedulerError, Username, VaccineName, parse_date,
};

/// Usage line for every command, in display order.
pub const USAGE: [&str; 13] = [
    "create_patient <username> <password>",
    "create_caregiver <username> <password>",
    "login_patient <username> <password>",
    "login_caregiver <username> <password>",
    "search_caregiver_schedule <date>",
    "reserve <date> <vaccine>",
    "upload_availability <date>",
    "cancel <appointment_id>",
    "add_doses <vaccine> <number>",
    "show_appointments",
    "logout",
    "help",
    "quit",
];

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `create_patient` / `create_caregiver`
    CreateAccount {
        /// Account kind
        role: Role,
        /// New username
        username: Username,
        /// Plain-text password, hashed before storage
        password: String,
    },
    /// `login_patient` / `login_caregiver`
    Login {
        /// Account kind
        role: Role,
        /// Username
        username: Username,
        /// Plain-text password
        password: String,
    },
    /// `search_caregiver_schedule <date>`
    SearchCaregiverSchedule {
        /// Day to search
        date: NaiveDate,
    },
    /// `reserve <date> <vaccine>`
    Reserve {
        /// Requested day
        date: NaiveDate,
        /// Requested vaccine
        vaccine: VaccineName,
    },
    /// `upload_availability <date>`
    UploadAvailability {
        /// Day the caregiver is free
        date: NaiveDate,
    },
    /// `cancel <appointment_id>`
    Cancel {
        /// Appointment to cancel
        id: AppointmentId,
    },
    /// `add_doses <vaccine> <number>`
    AddDoses {
        /// Vaccine to stock
        vaccine: VaccineName,
        /// Doses to add; negative values are rejected by the coordinator
        doses: i64,
    },
    /// `show_appointments`
    ShowAppointments,
    /// `logout`
    Logout,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

impl Command {
    /// Name of the command as typed at the prompt.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateAccount { role: Role::Patient, .. } => "create_patient",
            Self::CreateAccount { role: Role::Caregiver, .. } => "create_caregiver",
            Self::Login { role: Role::Patient, .. } => "login_patient",
            Self::Login { role: Role::Caregiver, .. } => "login_caregiver",
            Self::SearchCaregiverSchedule { .. } => "search_caregiver_schedule",
            Self::Reserve { .. } => "reserve",
            Self::UploadAvailability { .. } => "upload_availability",
            Self::Cancel { .. } => "cancel",
            Self::AddDoses { .. } => "add_doses",
            Self::ShowAppointments => "show_appointments",
            Self::Logout => "logout",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

fn usage_of(name: &str) -> SchedulerError {
    let usage = USAGE
        .iter()
        .find(|u| u.split_whitespace().next() == Some(name))
        .copied()
        .unwrap_or(name);
    SchedulerError::InvalidArgument(format!("usage: {usage}"))
}

fn expect_args<'a, const N: usize>(name: &str, args: &[&'a str]) -> Result<[&'a str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| usage_of(name))
}

fn credentials(role: Role, name: &str, args: &[&str]) -> Result<(Role, Username, String)> {
    let [username, password] = expect_args::<2>(name, args)?;
    Ok((role, Username::new(username)?, password.to_string()))
}

impl FromStr for Command {
    type Err = SchedulerError;

    fn from_str(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let Some(name) = tokens.next() else {
            return Err(SchedulerError::InvalidArgument(
                "empty command, type help for a list".to_string(),
            ));
        };
        let args: Vec<&str> = tokens.collect();

        let command = match name {
            "create_patient" | "create_caregiver" | "login_patient" | "login_caregiver" => {
                let role = if name.ends_with("patient") {
                    Role::Patient
                } else {
                    Role::Caregiver
                };
                let (role, username, password) = credentials(role, name, &args)?;
                if name.starts_with("create") {
                    Self::CreateAccount {
                        role,
                        username,
                        password,
                    }
                } else {
                    Self::Login {
                        role,
                        username,
                        password,
                    }
                }
            }
            "search_caregiver_schedule" => {
                let [date] = expect_args::<1>(name, &args)?;
                Self::SearchCaregiverSchedule {
                    date: parse_date(date)?,
                }
            }
            "reserve" => {
                let [date, vaccine] = expect_args::<2>(name, &args)?;
                Self::Reserve {
                    date: parse_date(date)?,
                    vaccine: VaccineName::new(vaccine)?,
                }
            }
            "upload_availability" => {
                let [date] = expect_args::<1>(name, &args)?;
                Self::UploadAvailability {
                    date: parse_date(date)?,
                }
            }
            "cancel" => {
                let [id] = expect_args::<1>(name, &args)?;
                Self::Cancel { id: id.parse()? }
            }
            "add_doses" => {
                let [vaccine, doses] = expect_args::<2>(name, &args)?;
                Self::AddDoses {
                    vaccine: VaccineName::new(vaccine)?,
                    doses: doses.parse().map_err(|_| {
                        SchedulerError::InvalidArgument(format!("'{doses}' is not a whole number"))
                    })?,
                }
            }
            "show_appointments" | "logout" | "help" | "quit" => {
                expect_args::<0>(name, &args)?;
                match name {
                    "show_appointments" => Self::ShowAppointments,
                    "logout" => Self::Logout,
                    "help" => Self::Help,
                    _ => Self::Quit,
                }
            }
            other => {
                return Err(SchedulerError::InvalidArgument(format!(
                    "unknown command '{other}', type help for a list"
                )));
            }
        };
        Ok(command)
    }
}
