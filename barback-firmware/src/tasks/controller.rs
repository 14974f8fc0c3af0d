//! Dispense controller task
//!
//! Sole owner of the pumps. Waits on, in priority order, the emergency stop
//! signal, queued commands and the tick, and forwards session events to the
//! MQTT task as status publishes. A signalled stop runs at once; batches
//! queued before it are cancelled when they come off the queue.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_time::Instant;

use barback_core::gateway::publish_event;
use barback_core::session::{DispenseController, Dispatch, SessionEvent};
use barback_protocol::{Command, Topics};

use crate::channels::{Inbound, QueuePublisher, COMMAND_CHANNEL, EMERGENCY_STOP};
use crate::pins::Relay;
use crate::tasks::tick::TICK_SIGNAL;

/// Controller task - main coordination loop
#[embassy_executor::task]
pub async fn controller_task(mut controller: DispenseController<Relay>, topics: &'static Topics) {
    info!(
        "Controller task started: {} pumps, run cap {} ms",
        controller.scheduler().pump_count(),
        controller.scheduler().max_run_ms()
    );

    let mut publisher = QueuePublisher;

    loop {
        // select3 polls in argument order, so a pending stop always wins
        match select3(
            EMERGENCY_STOP.wait(),
            COMMAND_CHANNEL.receive(),
            TICK_SIGNAL.wait(),
        )
        .await
        {
            Either3::First(()) => {
                let event = controller.preempt_stop();
                warn!("Emergency stop: all pumps off");
                report(&mut publisher, topics, event);
            }

            Either3::Second(inbound) => {
                let now_ms = Instant::now().as_millis();
                let command = match &inbound {
                    Inbound::MakeCocktail(payload) => Command::MakeCocktail(payload),
                    Inbound::EmergencyStop => Command::EmergencyStop,
                };
                let dispatch = controller.handle(command, now_ms);
                log_dispatch(&dispatch);
                if let Some(event) = dispatch.event() {
                    report(&mut publisher, topics, event);
                }
            }

            Either3::Third(now_ms) => {
                let outcome = controller.tick(now_ms);
                for pump in outcome.finished.iter() {
                    debug!("Pump {} finished", pump.number());
                }
                if let Some(event) = outcome.event {
                    info!("Cocktail completed");
                    report(&mut publisher, topics, event);
                }
            }
        }
    }
}

fn report(publisher: &mut QueuePublisher, topics: &Topics, event: SessionEvent) {
    if let Err(e) = publish_event(publisher, topics, event) {
        error!("Failed to queue status {:?}: {:?}", event, e);
    }
}

fn log_dispatch(dispatch: &Dispatch) {
    match dispatch {
        Dispatch::Accepted { decoded, report } => {
            for issue in decoded.issues.iter() {
                warn!(
                    "Instruction {}: {:?} (coerced to 0)",
                    issue.index, issue.kind
                );
            }
            if report.overflow > 0 {
                warn!("{} instructions past the batch limit ignored", report.overflow);
            }
            if report.merged_into_running {
                warn!("Batch arrived while dispensing, merged into running session");
            }
            info!(
                "Batch accepted: {} started, {} rejected",
                report.started.len(),
                report.rejected.len()
            );
            for run in report.started.iter() {
                info!(
                    "Pump {} on for {} ms{}",
                    run.pump.number(),
                    run.duration_ms,
                    if run.clamped { " (capped)" } else { "" }
                );
            }
            for rejection in report.rejected.iter() {
                warn!(
                    "Instruction {}: invalid pump {}",
                    rejection.index, rejection.pump
                );
            }
            if report.started.is_empty() && !report.state.pumps_allowed() {
                info!("Nothing to dispense");
            }
        }
        Dispatch::Dropped(error) => {
            warn!("Dispense command dropped: {:?}", error);
        }
        Dispatch::Stopped(_) => {
            warn!("Emergency stop: all pumps off");
        }
        Dispatch::Cancelled => {
            warn!("Dispense command cancelled by emergency stop");
        }
        Dispatch::StopSettled => {
            debug!("Queued emergency stop already executed");
        }
    }
}
