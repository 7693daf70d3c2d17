use clap::{Parser, Subcommand};
use pomotime_core::CoreError;
use tracing_subscriber::EnvFilter;

mod commands;
mod host;

#[derive(Parser)]
#[command(name = "pomotime", version, about = "Pomodoro cycle timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Timer durations and cycle length
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Host configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Write default settings and timer state (safe to repeat)
    Install,
    /// Open the settings page
    OpenSettings,
    /// Fire durable tick alarms as they come due
    Daemon(commands::daemon::DaemonArgs),
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_env("POMOTIME_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let is_daemon = matches!(cli.command, Commands::Daemon(_));
    init_tracing(if is_daemon { "info" } else { "warn" });

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Install => commands::timer::install(),
        Commands::OpenSettings => commands::timer::open_settings(),
        Commands::Daemon(args) => commands::daemon::run(args),
    };

    if let Err(e) = result {
        // Refusals were already announced through the host notification.
        let refused = e
            .downcast_ref::<CoreError>()
            .is_some_and(CoreError::is_refusal);
        if refused {
            std::process::exit(2);
        }
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
