//! Dispense session controller
//!
//! Owns the pump scheduler and the session state. Completion is
//! edge-triggered: a session arms once any of its pumps has run, and fires
//! [`SessionEvent::BatchCompleted`] exactly once when every pump is off again.
//! Emergency stop cuts every pump and disarms the session from any state.

use heapless::Vec;

use barback_protocol::{Instruction, MAX_INSTRUCTIONS};

use super::events::SessionEvent;
use super::machine::{SessionInput, SessionState};
use crate::pump::{ExpiryEvents, PumpId, PumpScheduler, SchedulerError, StartedRun};
use crate::traits::PumpActuator;

/// An instruction that could not be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rejection {
    /// Position in the batch
    pub index: u8,
    /// Raw pump number from the wire
    pub pump: i32,
    pub error: SchedulerError,
}

/// Outcome of accepting a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchReport {
    /// Runs started, in batch order
    pub started: Vec<StartedRun, MAX_INSTRUCTIONS>,
    /// Instructions skipped
    pub rejected: Vec<Rejection, MAX_INSTRUCTIONS>,
    /// Instructions past [`MAX_INSTRUCTIONS`], never started
    pub overflow: usize,
    /// Batch arrived while another was dispensing
    pub merged_into_running: bool,
    /// Session state after the batch
    pub state: SessionState,
}

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickOutcome {
    /// Pumps switched off on this tick
    pub finished: ExpiryEvents,
    /// Completion, if this tick drained the session
    pub event: Option<SessionEvent>,
}

/// Single owner of the dispense session and its pumps
pub struct DispenseController<A> {
    scheduler: PumpScheduler<A>,
    state: SessionState,
    /// Some pump of the current session has been observed running
    armed: bool,
    /// Stops executed ahead of their place in the command queue
    pub(super) stops_ahead: u8,
}

impl<A: PumpActuator> DispenseController<A> {
    /// Create an idle controller
    pub fn new(scheduler: PumpScheduler<A>) -> Self {
        Self {
            scheduler,
            state: SessionState::Idle,
            armed: false,
            stops_ahead: 0,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if a batch is in progress
    pub fn is_dispensing(&self) -> bool {
        self.state == SessionState::Dispensing
    }

    /// Check if completion will fire once the pumps drain
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Read access to the scheduler
    pub fn scheduler(&self) -> &PumpScheduler<A> {
        &self.scheduler
    }

    /// Start every instruction of a batch
    ///
    /// Invalid pumps are skipped and reported; they never abort the batch.
    /// Only the first [`MAX_INSTRUCTIONS`] are run, the rest are counted in
    /// [`BatchReport::overflow`].
    /// A batch arriving while dispensing is merged into the running session:
    /// named pumps get new deadlines, others keep running, and one completion
    /// covers all of them.
    pub fn accept_batch(&mut self, instructions: &[Instruction], now_ms: u64) -> BatchReport {
        let mut report = BatchReport {
            merged_into_running: self.is_dispensing(),
            ..BatchReport::default()
        };

        if !report.merged_into_running {
            self.armed = false;
        }

        let (runnable, overflow) = instructions.split_at(instructions.len().min(MAX_INSTRUCTIONS));
        report.overflow = overflow.len();

        for (index, instruction) in runnable.iter().enumerate() {
            let result = PumpId::from_wire(instruction.pump)
                .ok_or(SchedulerError::InvalidPump)
                .and_then(|pump| self.scheduler.start(pump, instruction.seconds, now_ms));

            // Both vectors hold MAX_INSTRUCTIONS
            let _ = match result {
                Ok(run) => report.started.push(run).map_err(|_| ()),
                Err(error) => report
                    .rejected
                    .push(Rejection {
                        index: index as u8,
                        pump: instruction.pump,
                        error,
                    })
                    .map_err(|_| ()),
            };
        }

        let started_any = !report.started.is_empty();
        if started_any {
            // A run shorter than one tick still counts as having run
            self.armed = true;
        }

        self.state = self
            .state
            .transition(SessionInput::BatchAccepted { started_any });
        report.state = self.state;
        report
    }

    /// Expire finished pumps and detect completion
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let finished = self.scheduler.tick(now_ms);
        let mut outcome = TickOutcome {
            finished,
            event: None,
        };

        if self.state != SessionState::Dispensing {
            return outcome;
        }

        if self.scheduler.any_active() {
            self.armed = true;
        } else if self.armed {
            self.armed = false;
            self.state = self.state.transition(SessionInput::Drained);
            outcome.event = Some(SessionEvent::BatchCompleted);
        }

        outcome
    }

    /// Stop every pump now
    ///
    /// Always reports [`SessionEvent::EmergencyStopExecuted`], even when idle.
    pub fn emergency_stop(&mut self) -> SessionEvent {
        self.scheduler.stop_all();
        self.armed = false;
        self.state = self.state.transition(SessionInput::EmergencyStop);
        SessionEvent::EmergencyStopExecuted
    }

    /// Stop every pump ahead of the command queue
    ///
    /// For transports that signal a stop out of band and also queue it in
    /// arrival order. Until that queued stop is handled, [`Self::handle`]
    /// cancels the batches queued before it, and the queued stop itself is
    /// not executed again.
    pub fn preempt_stop(&mut self) -> SessionEvent {
        self.stops_ahead = self.stops_ahead.saturating_add(1);
        self.emergency_stop()
    }

    /// Check if a preempted stop is still waiting in the queue
    pub fn is_stop_pending(&self) -> bool {
        self.stops_ahead > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPump;
    use proptest::prelude::*;

    fn controller() -> DispenseController<MockPump> {
        let scheduler = PumpScheduler::new((0..4).map(|_| MockPump::default())).unwrap();
        DispenseController::new(scheduler)
    }

    fn energized(c: &DispenseController<MockPump>, n: u8) -> bool {
        c.scheduler()
            .actuator(PumpId::new(n).unwrap())
            .unwrap()
            .is_energized()
    }

    /// Tick every `step_ms` from `from_ms` up to `to_ms`, collecting events
    fn run_until(
        c: &mut DispenseController<MockPump>,
        from_ms: u64,
        to_ms: u64,
        step_ms: u64,
    ) -> heapless::Vec<(u64, SessionEvent), 8> {
        let mut events = heapless::Vec::new();
        let mut now = from_ms;
        while now <= to_ms {
            if let Some(event) = c.tick(now).event {
                events.push((now, event)).unwrap();
            }
            now += step_ms;
        }
        events
    }

    #[test]
    fn test_batch_completes_once_after_longest_pump() {
        let mut c = controller();
        let batch = [Instruction::new(1, 1.0), Instruction::new(2, 2.0)];
        let report = c.accept_batch(&batch, 10_000);
        assert_eq!(report.started.len(), 2);
        assert!(report.rejected.is_empty());
        assert!(!report.merged_into_running);
        assert_eq!(report.state, SessionState::Dispensing);

        let before = run_until(&mut c, 10_000, 11_990, 10);
        assert!(before.is_empty());
        assert!(energized(&c, 2));

        let after = run_until(&mut c, 12_000, 20_000, 10);
        assert_eq!(after.as_slice(), &[(12_000, SessionEvent::BatchCompleted)]);
        assert_eq!(c.state(), SessionState::Idle);
        assert!(!energized(&c, 1));
        assert!(!energized(&c, 2));
    }

    #[test]
    fn test_oversized_batch_reports_overflow() {
        let mut c = controller();
        let mut batch: heapless::Vec<Instruction, 17> = heapless::Vec::new();
        for _ in 0..16 {
            batch.push(Instruction::new(9, 1.0)).unwrap();
        }
        batch.push(Instruction::new(1, 1.0)).unwrap();

        let report = c.accept_batch(&batch, 0);
        assert_eq!(report.rejected.len(), 16);
        assert!(report.started.is_empty());
        assert_eq!(report.overflow, 1);
        assert_eq!(
            report.started.len() + report.rejected.len() + report.overflow,
            batch.len()
        );
        assert!(!energized(&c, 1));
    }

    #[test]
    fn test_only_invalid_pumps_never_completes() {
        let mut c = controller();
        let report = c.accept_batch(&[Instruction::new(9, 1.0)], 0);
        assert!(report.started.is_empty());
        assert_eq!(
            report.rejected.as_slice(),
            &[Rejection {
                index: 0,
                pump: 9,
                error: SchedulerError::InvalidPump
            }]
        );
        assert_eq!(report.state, SessionState::Idle);
        assert!(!c.scheduler().any_active());
        assert!(run_until(&mut c, 0, 60_000, 100).is_empty());
    }

    #[test]
    fn test_empty_batch_never_completes() {
        let mut c = controller();
        let report = c.accept_batch(&[], 0);
        assert_eq!(report.state, SessionState::Idle);
        assert!(run_until(&mut c, 0, 10_000, 100).is_empty());
    }

    #[test]
    fn test_invalid_pump_does_not_abort_batch() {
        let mut c = controller();
        let batch = [
            Instruction::new(0, 1.0),
            Instruction::new(3, 1.0),
            Instruction::new(-2, 1.0),
        ];
        let report = c.accept_batch(&batch, 0);
        assert_eq!(report.started.len(), 1);
        assert_eq!(report.started[0].pump.number(), 3);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].index, 0);
        assert_eq!(report.rejected[1].index, 2);
        assert!(energized(&c, 3));
    }

    #[test]
    fn test_emergency_stop_mid_run() {
        let mut c = controller();
        c.accept_batch(&[Instruction::new(1, 5.0), Instruction::new(2, 5.0)], 0);
        run_until(&mut c, 0, 1_000, 10);

        assert_eq!(c.emergency_stop(), SessionEvent::EmergencyStopExecuted);
        assert!(!energized(&c, 1));
        assert!(!energized(&c, 2));
        assert_eq!(c.state(), SessionState::Idle);
        assert!(!c.is_armed());

        // Original deadlines pass without a completion
        assert!(run_until(&mut c, 1_000, 10_000, 10).is_empty());
    }

    #[test]
    fn test_emergency_stop_while_idle() {
        let mut c = controller();
        assert_eq!(c.emergency_stop(), SessionEvent::EmergencyStopExecuted);
        assert_eq!(c.state(), SessionState::Idle);
        assert!(run_until(&mut c, 0, 1_000, 10).is_empty());
    }

    #[test]
    fn test_zero_second_run_still_completes() {
        let mut c = controller();
        let report = c.accept_batch(&[Instruction::new(1, 0.0)], 500);
        assert_eq!(report.state, SessionState::Dispensing);

        let outcome = c.tick(500);
        assert_eq!(outcome.finished.len(), 1);
        assert_eq!(outcome.event, Some(SessionEvent::BatchCompleted));
    }

    #[test]
    fn test_run_shorter_than_tick_completes() {
        let mut c = controller();
        c.accept_batch(&[Instruction::new(4, 0.003)], 0);
        // First tick lands after the pump already expired
        let outcome = c.tick(10);
        assert_eq!(outcome.event, Some(SessionEvent::BatchCompleted));
    }

    #[test]
    fn test_batch_while_dispensing_is_merged() {
        let mut c = controller();
        c.accept_batch(&[Instruction::new(1, 2.0)], 0);
        assert!(run_until(&mut c, 0, 1_000, 100).is_empty());

        let report = c.accept_batch(&[Instruction::new(2, 3.0)], 1_000);
        assert!(report.merged_into_running);
        assert_eq!(report.state, SessionState::Dispensing);

        // Pump 1 finishes at 2 s but pump 2 keeps the session open
        assert!(run_until(&mut c, 1_100, 3_900, 100).is_empty());
        assert!(!energized(&c, 1));

        let events = run_until(&mut c, 4_000, 6_000, 100);
        assert_eq!(events.as_slice(), &[(4_000, SessionEvent::BatchCompleted)]);
    }

    #[test]
    fn test_merge_after_silent_drain_keeps_completion() {
        let mut c = controller();
        c.accept_batch(&[Instruction::new(1, 1.0)], 0);
        // Pump expired but no tick has observed it; an empty batch arrives
        let report = c.accept_batch(&[], 5_000);
        assert!(report.merged_into_running);
        assert_eq!(c.tick(5_000).event, Some(SessionEvent::BatchCompleted));
    }

    #[test]
    fn test_second_batch_after_completion_fires_again() {
        let mut c = controller();
        c.accept_batch(&[Instruction::new(1, 1.0)], 0);
        assert_eq!(run_until(&mut c, 0, 2_000, 100).len(), 1);

        let report = c.accept_batch(&[Instruction::new(1, 1.0)], 3_000);
        assert!(!report.merged_into_running);
        assert_eq!(run_until(&mut c, 3_000, 6_000, 100).len(), 1);
    }

    proptest! {
        #[test]
        fn prop_completion_fires_exactly_once(
            batch in proptest::collection::vec((1i32..=4, 0u32..5_000), 1..8),
            step_ms in 1u64..500,
        ) {
            let mut c = controller();
            let instructions: heapless::Vec<Instruction, 8> = batch
                .iter()
                .map(|(pump, ms)| Instruction::new(*pump, *ms as f32 / 1000.0))
                .collect();
            c.accept_batch(&instructions, 0);

            let mut completions = 0;
            let mut now = 0;
            while now <= 20_000 {
                if c.tick(now).event.is_some() {
                    completions += 1;
                    prop_assert!(!c.scheduler().any_active());
                }
                now += step_ms;
            }
            prop_assert_eq!(completions, 1);
        }

        #[test]
        fn prop_emergency_stop_silences_session(
            stop_at in 0u64..5_000,
        ) {
            let mut c = controller();
            c.accept_batch(&[Instruction::new(1, 3.0), Instruction::new(2, 4.0)], 0);
            let mut completions = 0;
            let mut now = 0;
            while now < stop_at {
                if c.tick(now).event.is_some() {
                    completions += 1;
                }
                now += 10;
            }
            c.emergency_stop();
            prop_assert!(!c.scheduler().any_active());
            while now <= 10_000 {
                if c.tick(now).event.is_some() {
                    completions += 1;
                }
                now += 10;
            }
            // Completion only if the batch had already drained before the stop
            prop_assert!(completions <= 1);
            if stop_at <= 4_000 {
                prop_assert_eq!(completions, 0);
            }
        }
    }
}
