use serde::{Deserialize, Serialize};
use tracing::error;

use super::driver::TimerDriver;
use super::phase::{Notice, Phase};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::host::{AlarmScheduler, Host};

/// Commands accepted from UI surfaces, as tagged messages:
/// `{"action": "startWork"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    StartWork,
    StartBreak,
    StartLargeBreak,
    Stop,
    Reset,
    OpenSettings,
}

impl Command {
    /// Parse a tagged JSON message.
    pub fn from_message(message: &str) -> Result<Self> {
        serde_json::from_str(message)
            .map_err(|_| ValidationError::UnknownCommand(message.trim().to_string()).into())
    }

    /// The phase a start command asks for.
    pub fn phase(self) -> Option<Phase> {
        match self {
            Command::StartWork => Some(Phase::Work),
            Command::StartBreak => Some(Phase::Break),
            Command::StartLargeBreak => Some(Phase::LargeBreak),
            _ => None,
        }
    }
}

/// Routes commands into the driver and tells the user when one is refused.
///
/// The running check and the state change happen in one store transaction
/// inside [`TimerDriver::start`], so two starts can never both pass.
pub struct Dispatcher<H, A> {
    driver: TimerDriver<H, A>,
}

impl<H: Host, A: AlarmScheduler> Dispatcher<H, A> {
    pub fn new(driver: TimerDriver<H, A>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &TimerDriver<H, A> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut TimerDriver<H, A> {
        &mut self.driver
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Event> {
        let result = match command {
            Command::StartWork | Command::StartBreak | Command::StartLargeBreak => {
                let phase = command.phase().unwrap_or(Phase::Work);
                self.driver.start(phase)
            }
            Command::Stop => self.driver.stop(),
            Command::Reset => self.driver.reset(),
            Command::OpenSettings => Ok(self.driver.open_settings()),
        };

        if let Err(err) = &result {
            match err {
                CoreError::AlreadyRunning { phase } => {
                    self.driver.announce(&Notice::already_running(*phase));
                }
                CoreError::NotRunning => self.driver.announce(&Notice::not_running()),
                other => error!(?command, error = %other, "command failed"),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::Page;
    use crate::storage::{AlarmTable, Database, StateStore};
    use crate::testing::RecordingHost;
    use crate::timer::TimerState;

    fn dispatcher() -> Dispatcher<RecordingHost, AlarmTable> {
        let store = StateStore::new(Database::open_memory().unwrap());
        let alarms = AlarmTable::new(Database::open_memory().unwrap());
        Dispatcher::new(TimerDriver::new(store, RecordingHost::default(), alarms))
    }

    #[test]
    fn parses_tagged_messages() {
        assert_eq!(
            Command::from_message(r#"{"action":"startLargeBreak"}"#).unwrap(),
            Command::StartLargeBreak
        );
        assert_eq!(
            Command::from_message(r#"{"action":"openSettings"}"#).unwrap(),
            Command::OpenSettings
        );
        assert!(matches!(
            Command::from_message(r#"{"action":"startNap"}"#),
            Err(CoreError::Validation(ValidationError::UnknownCommand(_)))
        ));
    }

    #[test]
    fn start_commands_name_their_phase() {
        assert_eq!(Command::StartWork.phase(), Some(Phase::Work));
        assert_eq!(Command::StartBreak.phase(), Some(Phase::Break));
        assert_eq!(Command::StartLargeBreak.phase(), Some(Phase::LargeBreak));
        assert_eq!(Command::Stop.phase(), None);
        assert_eq!(Command::OpenSettings.phase(), None);
    }

    #[test]
    fn start_break_overrides_current_phase() {
        let mut dispatcher = dispatcher();
        dispatcher.dispatch(Command::StartBreak).unwrap();
        let state = dispatcher.driver().store().get_state().unwrap();
        assert_eq!(state.current_phase, Phase::Break);
        assert!(state.is_running);
        assert_eq!(
            dispatcher
                .driver()
                .store()
                .countdown()
                .unwrap()
                .unwrap()
                .config_id,
            Phase::Break
        );
    }

    #[test]
    fn second_start_is_refused_with_notification() {
        let mut dispatcher = dispatcher();
        dispatcher.dispatch(Command::StartWork).unwrap();
        let before = dispatcher.driver().store().get_state().unwrap();

        let err = dispatcher.dispatch(Command::StartLargeBreak).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRunning { phase: Phase::Work }));
        assert_eq!(dispatcher.driver().store().get_state().unwrap(), before);
        let (_, message) = dispatcher.driver().host().notifications.last().unwrap();
        assert_eq!(message, "A work timer is already running");
    }

    #[test]
    fn stop_when_idle_notifies() {
        let mut dispatcher = dispatcher();
        assert!(matches!(
            dispatcher.dispatch(Command::Stop),
            Err(CoreError::NotRunning)
        ));
        assert_eq!(
            dispatcher.driver().host().notifications.last().unwrap().1,
            "No timer running"
        );
        assert_eq!(
            dispatcher.driver().store().get_state().unwrap(),
            TimerState::default()
        );
    }

    #[test]
    fn reset_then_start_again() {
        let mut dispatcher = dispatcher();
        dispatcher.dispatch(Command::StartWork).unwrap();
        dispatcher.dispatch(Command::Reset).unwrap();
        assert!(dispatcher.dispatch(Command::StartWork).is_ok());
    }

    #[test]
    fn open_settings_goes_to_host() {
        let mut dispatcher = dispatcher();
        let event = dispatcher.dispatch(Command::OpenSettings).unwrap();
        assert!(matches!(event, Event::SettingsOpened { .. }));
        assert_eq!(dispatcher.driver().host().pages, vec![Page::Settings]);
    }
}
