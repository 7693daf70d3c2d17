use clap::Subcommand;
use pomotime_core::storage::Database;
use pomotime_core::SettingsProvider;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print effective settings, or one field
    Get {
        /// workTime, breakTime, largeBreakTime or maxCycles
        field: Option<String>,
    },
    /// Set one field to a positive integer
    Set {
        field: String,
        value: String,
    },
    /// Restore default durations and cycle count
    Reset,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let provider = SettingsProvider::new(&db);

    match action {
        SettingsAction::Get { field } => {
            let settings = serde_json::to_value(provider.effective()?)?;
            match field {
                Some(field) => match settings.get(&field) {
                    Some(value) => println!("{value}"),
                    None => return Err(format!("unknown setting: {field}").into()),
                },
                None => println!("{}", serde_json::to_string_pretty(&settings)?),
            }
        }
        SettingsAction::Set { field, value } => {
            let settings = provider.update(&field, &value)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Reset => {
            provider.reset()?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
