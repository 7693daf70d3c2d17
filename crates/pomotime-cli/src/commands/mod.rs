pub mod config;
pub mod daemon;
pub mod settings;
pub mod stats;
pub mod timer;

use pomotime_core::storage::{data_dir, AlarmTable, Database, StateStore};
use pomotime_core::{Config, Dispatcher, Event, TimerDriver};

use crate::host::DesktopHost;

pub type CliDispatcher = Dispatcher<DesktopHost, AlarmTable>;

/// Build a dispatcher over the on-disk store and reconcile it.
///
/// Every invocation is a fresh process, so this is the startup path:
/// defaults are installed and a countdown that lost its alarm is re-armed.
pub fn open_dispatcher() -> Result<CliDispatcher, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let host = DesktopHost::new(config, data_dir()?);
    let store = StateStore::new(Database::open()?);
    let alarms = AlarmTable::new(Database::open()?);

    let mut dispatcher = Dispatcher::new(TimerDriver::new(store, host, alarms));
    if let Some(event) = dispatcher.driver_mut().recover()? {
        print_event(&event)?;
    }
    Ok(dispatcher)
}

pub fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}
