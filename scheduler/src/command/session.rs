//! The logged-in actor, if any.

use vaccine_scheduler_core::{Actor, Result, SchedulerError};

/// At most one logged-in actor.
///
/// Owned by the [`CommandEngine`](super::CommandEngine) and passed into the
/// services as an explicit [`Actor`] on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    actor: Option<Actor>,
}

impl Session {
    /// A session with nobody logged in.
    #[must_use]
    pub const fn new() -> Self {
        Self { actor: None }
    }

    /// The logged-in actor.
    #[must_use]
    pub const fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// The logged-in actor, or an error if nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Unauthenticated`] if nobody is logged in.
    pub fn require(&self) -> Result<&Actor> {
        self.actor.as_ref().ok_or(SchedulerError::Unauthenticated)
    }

    /// Fail if somebody is already logged in.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Conflict`] naming the current actor.
    pub fn require_anonymous(&self) -> Result<()> {
        match &self.actor {
            Some(actor) => Err(SchedulerError::Conflict(format!(
                "already logged in as {actor}, logout first"
            ))),
            None => Ok(()),
        }
    }

    /// Start a session for `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Conflict`] if somebody is already logged in.
    pub fn login(&mut self, actor: Actor) -> Result<()> {
        self.require_anonymous()?;
        self.actor = Some(actor);
        Ok(())
    }

    /// End the session, returning who was logged in.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Unauthenticated`] if nobody is logged in.
    pub fn logout(&mut self) -> Result<Actor> {
        self.actor.take().ok_or(SchedulerError::Unauthenticated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vaccine_scheduler_core::Username;

    #[test]
    fn test_login_logout_cycle() {
        let mut session = Session::new();
        let dave = Actor::patient(Username::new("dave").unwrap());

        assert_eq!(session.require().unwrap_err(), SchedulerError::Unauthenticated);
        session.login(dave.clone()).unwrap();
        assert_eq!(session.require().unwrap(), &dave);

        let carol = Actor::caregiver(Username::new("carol").unwrap());
        assert!(matches!(
            session.login(carol).unwrap_err(),
            SchedulerError::Conflict(_)
        ));

        assert_eq!(session.logout().unwrap(), dave);
        assert_eq!(session.logout().unwrap_err(), SchedulerError::Unauthenticated);
        assert!(session.actor().is_none());
    }
}
