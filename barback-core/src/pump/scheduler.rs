//! Pump scheduler
//!
//! Owns every pump actuator together with its timing state. Runs are started
//! with a deadline and expire independently; nothing here blocks or sleeps.
//! The caller drives expiry by calling [`PumpScheduler::tick`] with the
//! current monotonic time at any cadence.

use heapless::Vec;

use barback_protocol::seconds_to_millis;

use super::state::{PumpId, PumpState, MAX_PUMPS};
use crate::traits::PumpActuator;

/// Default upper bound on a single run (5 minutes)
pub const DEFAULT_MAX_RUN_MS: u32 = 300_000;

/// Scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// Pump number outside `1..=pump_count`
    InvalidPump,
    /// Constructed without actuators
    NoPumps,
    /// More actuators than [`MAX_PUMPS`]
    TooManyPumps,
}

/// What `start` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartedRun {
    pub pump: PumpId,
    /// Run length actually scheduled
    pub duration_ms: u32,
    /// Requested length exceeded the run cap
    pub clamped: bool,
    /// Pump was already running; its deadline was replaced
    pub restarted: bool,
}

/// Pumps that finished during one tick
pub type ExpiryEvents = Vec<PumpId, MAX_PUMPS>;

struct PumpChannel<A> {
    actuator: A,
    state: PumpState,
}

/// Independent timed control of up to [`MAX_PUMPS`] pumps
pub struct PumpScheduler<A> {
    channels: Vec<PumpChannel<A>, MAX_PUMPS>,
    max_run_ms: u32,
}

impl<A: PumpActuator> PumpScheduler<A> {
    /// Take ownership of the actuators, in pump order
    ///
    /// Every actuator is switched off.
    pub fn new<I>(actuators: I) -> Result<Self, SchedulerError>
    where
        I: IntoIterator<Item = A>,
    {
        let mut channels = Vec::new();
        for mut actuator in actuators {
            actuator.deenergize();
            channels
                .push(PumpChannel {
                    actuator,
                    state: PumpState::idle(),
                })
                .map_err(|_| SchedulerError::TooManyPumps)?;
        }

        if channels.is_empty() {
            return Err(SchedulerError::NoPumps);
        }

        Ok(Self {
            channels,
            max_run_ms: DEFAULT_MAX_RUN_MS,
        })
    }

    /// Set the single-run cap
    pub fn with_max_run(mut self, max_run_ms: u32) -> Self {
        self.max_run_ms = max_run_ms;
        self
    }

    /// Single-run cap in milliseconds
    pub fn max_run_ms(&self) -> u32 {
        self.max_run_ms
    }

    /// Number of pumps
    pub fn pump_count(&self) -> usize {
        self.channels.len()
    }

    /// Start (or restart) a pump
    ///
    /// Restarting a running pump replaces its deadline with `now + duration`.
    pub fn start(
        &mut self,
        pump: PumpId,
        seconds: f32,
        now_ms: u64,
    ) -> Result<StartedRun, SchedulerError> {
        let max_run_ms = self.max_run_ms;
        let channel = self
            .channels
            .get_mut(pump.index())
            .ok_or(SchedulerError::InvalidPump)?;

        let requested = seconds_to_millis(seconds);
        let duration_ms = requested.min(max_run_ms);
        let restarted = channel.state.active;

        channel.actuator.energize();
        channel.state = PumpState::running(now_ms, duration_ms);

        Ok(StartedRun {
            pump,
            duration_ms,
            clamped: requested > max_run_ms,
            restarted,
        })
    }

    /// Switch off every pump whose deadline has passed
    ///
    /// Returns the pumps that finished on this call. Calling again with the
    /// same time returns nothing.
    pub fn tick(&mut self, now_ms: u64) -> ExpiryEvents {
        let mut finished = ExpiryEvents::new();
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if channel.state.is_expired(now_ms) {
                channel.actuator.deenergize();
                channel.state = PumpState::idle();
                // Capacity equals channel count
                let _ = finished.push(PumpId::from_index(index));
            }
        }
        finished
    }

    /// Check if any pump is running
    pub fn any_active(&self) -> bool {
        self.channels.iter().any(|c| c.state.active)
    }

    /// Number of running pumps
    pub fn active_count(&self) -> usize {
        self.channels.iter().filter(|c| c.state.active).count()
    }

    /// Switch every pump off unconditionally
    pub fn stop_all(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.actuator.deenergize();
            channel.state = PumpState::idle();
        }
    }

    /// Timing state of a pump
    pub fn state(&self, pump: PumpId) -> Option<&PumpState> {
        self.channels.get(pump.index()).map(|c| &c.state)
    }

    /// Time left on a pump's current run
    pub fn remaining_ms(&self, pump: PumpId, now_ms: u64) -> Option<u32> {
        self.state(pump).map(|s| s.remaining_ms(now_ms))
    }

    /// Actuator of a pump
    pub fn actuator(&self, pump: PumpId) -> Option<&A> {
        self.channels.get(pump.index()).map(|c| &c.actuator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPump;
    use proptest::prelude::*;

    fn pump(n: u8) -> PumpId {
        PumpId::new(n).unwrap()
    }

    fn scheduler(count: usize) -> PumpScheduler<MockPump> {
        PumpScheduler::new((0..count).map(|_| MockPump::default())).unwrap()
    }

    fn energized(s: &PumpScheduler<MockPump>, n: u8) -> bool {
        s.actuator(pump(n)).unwrap().is_energized()
    }

    #[test]
    fn test_new_switches_everything_off() {
        let pumps = [MockPump::on(), MockPump::on()];
        let s = PumpScheduler::new(pumps).unwrap();
        assert!(!energized(&s, 1));
        assert!(!energized(&s, 2));
        assert!(!s.any_active());
    }

    #[test]
    fn test_new_rejects_bad_counts() {
        let none: [MockPump; 0] = [];
        assert_eq!(
            PumpScheduler::new(none).err(),
            Some(SchedulerError::NoPumps)
        );
        assert_eq!(
            PumpScheduler::new((0..MAX_PUMPS + 1).map(|_| MockPump::default())).err(),
            Some(SchedulerError::TooManyPumps)
        );
    }

    #[test]
    fn test_run_expires_at_deadline() {
        let mut s = scheduler(4);
        let run = s.start(pump(1), 2.0, 1_000).unwrap();
        assert_eq!(run.duration_ms, 2_000);
        assert!(!run.restarted);
        assert!(energized(&s, 1));

        assert!(s.tick(2_999).is_empty());
        assert!(energized(&s, 1));

        let finished = s.tick(3_000);
        assert_eq!(finished.as_slice(), &[pump(1)]);
        assert!(!energized(&s, 1));
        assert!(!s.any_active());

        // Finishes exactly once
        assert!(s.tick(3_001).is_empty());
    }

    #[test]
    fn test_restart_overwrites_deadline() {
        let mut s = scheduler(4);
        s.start(pump(2), 5.0, 0).unwrap();
        assert!(s.tick(3_000).is_empty());

        let run = s.start(pump(2), 2.0, 3_000).unwrap();
        assert!(run.restarted);

        // First deadline (5 s) and additive deadline (7 s) are both ignored
        assert_eq!(s.tick(5_000).as_slice(), &[pump(2)]);
        assert!(!s.state(pump(2)).unwrap().active);
    }

    #[test]
    fn test_invalid_pump() {
        let mut s = scheduler(4);
        assert_eq!(
            s.start(pump(5), 1.0, 0).err(),
            Some(SchedulerError::InvalidPump)
        );
        assert!(!s.any_active());
    }

    #[test]
    fn test_pumps_expire_independently() {
        let mut s = scheduler(4);
        s.start(pump(1), 1.0, 0).unwrap();
        s.start(pump(3), 3.0, 0).unwrap();
        assert_eq!(s.active_count(), 2);

        assert_eq!(s.tick(1_000).as_slice(), &[pump(1)]);
        assert!(energized(&s, 3));
        assert_eq!(s.remaining_ms(pump(3), 1_000), Some(2_000));

        assert_eq!(s.tick(3_000).as_slice(), &[pump(3)]);
        assert!(!s.any_active());
    }

    #[test]
    fn test_coarse_tick_finishes_several() {
        let mut s = scheduler(4);
        s.start(pump(1), 0.5, 0).unwrap();
        s.start(pump(4), 0.8, 0).unwrap();
        let finished = s.tick(10_000);
        assert_eq!(finished.len(), 2);
        assert!(finished.contains(&pump(1)));
        assert!(finished.contains(&pump(4)));
    }

    #[test]
    fn test_run_cap() {
        let mut s = scheduler(2).with_max_run(10_000);
        let run = s.start(pump(1), 60.0, 0).unwrap();
        assert!(run.clamped);
        assert_eq!(run.duration_ms, 10_000);
        assert_eq!(s.tick(10_000).len(), 1);
    }

    #[test]
    fn test_degenerate_durations_expire_on_next_tick() {
        let mut s = scheduler(2);
        assert_eq!(s.start(pump(1), -1.0, 100).unwrap().duration_ms, 0);
        assert_eq!(s.start(pump(2), f32::NAN, 100).unwrap().duration_ms, 0);
        assert_eq!(s.tick(100).len(), 2);
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let mut s = scheduler(4);
        s.start(pump(1), 5.0, 0).unwrap();
        s.start(pump(2), 5.0, 0).unwrap();

        s.stop_all();
        assert!(!s.any_active());
        assert!(!energized(&s, 1));
        assert!(!energized(&s, 2));

        s.stop_all();
        assert!(!s.any_active());
        assert!(s.tick(10_000).is_empty());
    }

    proptest! {
        #[test]
        fn prop_restart_uses_latest_deadline(
            first_ms in 0u32..100_000,
            gap_ms in 0u32..100_000,
            second_ms in 0u32..100_000,
        ) {
            let mut s = scheduler(1);
            s.start(pump(1), first_ms as f32 / 1000.0, 0).unwrap();
            let restart_at = u64::from(gap_ms.min(first_ms.saturating_sub(1)));
            s.tick(restart_at);
            s.start(pump(1), second_ms as f32 / 1000.0, restart_at).unwrap();

            let deadline = restart_at + u64::from(second_ms);
            if second_ms > 0 {
                prop_assert!(s.tick(deadline - 1).is_empty());
                prop_assert!(s.any_active());
            }
            prop_assert_eq!(s.tick(deadline).len(), 1);
            prop_assert!(!s.any_active());
        }

        #[test]
        fn prop_each_run_finishes_once(
            durations in proptest::collection::vec(0u32..20_000, 1..=MAX_PUMPS),
            step_ms in 1u64..2_000,
        ) {
            let mut s = scheduler(durations.len());
            for (i, d) in durations.iter().enumerate() {
                s.start(pump(i as u8 + 1), *d as f32 / 1000.0, 0).unwrap();
            }

            let mut finished = [0u32; MAX_PUMPS];
            let mut now = 0;
            while s.any_active() {
                for id in s.tick(now) {
                    finished[id.index()] += 1;
                    prop_assert!(now >= u64::from(durations[id.index()]));
                }
                now += step_ms;
            }

            for count in &finished[..durations.len()] {
                prop_assert_eq!(*count, 1);
            }
        }
    }
}
