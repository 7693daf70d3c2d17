//! Tick daemon.
//!
//! Polls the durable alarm table and delivers due alarms to a driver. The
//! daemon keeps no countdown of its own: killing and restarting it loses
//! nothing, and missed periods are delivered as one catch-up tick.
//!
//! Every poll ends with a `recover()`. CLI processes start and stop timers
//! while the daemon runs; if one of them starts a countdown just as the
//! daemon cancels the finished one's alarm, the next poll re-arms it.

use std::time::Duration;

use clap::Args;
use pomotime_core::Config;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::{open_dispatcher, print_event, CliDispatcher};

#[derive(Args)]
pub struct DaemonArgs {
    /// Seconds between alarm polls (defaults to daemon.poll_interval_secs)
    #[arg(long)]
    poll_interval: Option<u64>,
    /// Fire whatever is due now and exit
    #[arg(long)]
    once: bool,
}

pub fn run(args: DaemonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let poll_secs = args
        .poll_interval
        .unwrap_or(config.daemon.poll_interval_secs)
        .max(1);

    let mut dispatcher = open_dispatcher()?;
    if args.once {
        let fired = fire_due(&mut dispatcher)?;
        info!(fired, "delivered due alarms");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(dispatcher, Duration::from_secs(poll_secs)))
}

async fn serve(
    mut dispatcher: CliDispatcher,
    poll: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(poll_secs = poll.as_secs(), "tick daemon started");

    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A failed poll is retried on the next interval.
                if let Err(e) = fire_due(&mut dispatcher) {
                    error!(error = %e, "alarm delivery failed");
                }
            }
            result = &mut shutdown => {
                result?;
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

/// Deliver every due alarm once, then reconcile. Returns how many fired.
fn fire_due(dispatcher: &mut CliDispatcher) -> Result<usize, Box<dyn std::error::Error>> {
    let driver = dispatcher.driver_mut();
    let due = driver.alarms_mut().due()?;
    for alarm in &due {
        if let Some(event) = driver.on_alarm(&alarm.name, alarm.elapsed)? {
            print_event(&event)?;
        }
    }
    if let Some(event) = driver.recover()? {
        print_event(&event)?;
    }
    Ok(due.len())
}
