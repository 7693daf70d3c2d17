use clap::Subcommand;
use pomotime_core::timer::TICK_ALARM;
use pomotime_core::Command;

use super::{open_dispatcher, print_event};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a work session
    StartWork,
    /// Start a short break
    StartBreak,
    /// Start a long break
    StartLargeBreak,
    /// Stop the running countdown
    Stop,
    /// Cancel everything and return to the initial state
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Advance the countdown by hand (for hosts without the daemon)
    ///
    /// The durable tick alarm is pushed back by the same number of minutes,
    /// so a running daemon does not count them a second time.
    Tick {
        /// Whole minutes to apply
        #[arg(long, default_value = "1")]
        elapsed: u32,
    },
    /// Dispatch a tagged JSON message, e.g. '{"action":"startWork"}'
    Send {
        message: String,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = open_dispatcher()?;

    let command = match action {
        TimerAction::StartWork => Command::StartWork,
        TimerAction::StartBreak => Command::StartBreak,
        TimerAction::StartLargeBreak => Command::StartLargeBreak,
        TimerAction::Stop => Command::Stop,
        TimerAction::Reset => Command::Reset,
        TimerAction::Send { message } => Command::from_message(&message)?,
        TimerAction::Status => {
            let snapshot = dispatcher.driver().snapshot()?;
            return print_event(&snapshot);
        }
        TimerAction::Tick { elapsed } => {
            let elapsed = elapsed.max(1);
            let driver = dispatcher.driver_mut();
            match driver.tick(elapsed)? {
                Some(event) => {
                    // A no-op once the countdown completed and cancelled it.
                    driver.alarms_mut().skip(TICK_ALARM, elapsed)?;
                    print_event(&event)?;
                }
                None => eprintln!("no timer running"),
            }
            return Ok(());
        }
    };

    let event = dispatcher.dispatch(command)?;
    print_event(&event)
}

pub fn install() -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = open_dispatcher()?;
    print_event(&dispatcher.driver().snapshot()?)
}

pub fn open_settings() -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = open_dispatcher()?;
    let event = dispatcher.dispatch(Command::OpenSettings)?;
    print_event(&event)
}
